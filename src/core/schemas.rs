//! Database schema for the installed-mods store.

pub const MOD_DB_NAME: &str = "mhwimm.db";
pub const MOD_TABLE: &str = "mod_files";
pub const AUDIT_LOG_NAME: &str = "store.events.jsonl";

/// A directory shared by several mods is recorded once per mod, hence the
/// composite key.
pub const MOD_DB_SCHEMA: &str = "
    CREATE TABLE mod_files (
        mod_name TEXT NOT NULL,
        mod_path TEXT NOT NULL,
        install_date TEXT NOT NULL,
        PRIMARY KEY (mod_name, mod_path)
    )
";
