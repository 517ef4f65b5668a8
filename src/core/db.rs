use crate::core::broker::AuditLog;
use crate::core::error::{self, StoreError};
use crate::core::schemas;
use crate::core::store::{DeleteScope, ModRecord, RecordFilter};
use rusqlite::{Connection, params, params_from_iter};
use std::fs;
use std::path::{Path, PathBuf};

pub fn db_connect(db_path: &str) -> Result<Connection, error::MhwimmError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::MhwimmError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::MhwimmError::RusqliteError)?;
    Ok(conn)
}

pub fn mod_db_path(root: &Path) -> PathBuf {
    root.join(schemas::MOD_DB_NAME)
}

/// Single-writer handle on the installed-mods table.
///
/// Every call leaves a diagnostic behind (`"ok"` or the rendered
/// [`StoreError`]) that stays readable until the next call, and appends one
/// event to the audit log.
pub struct ModStore {
    conn: Connection,
    db_path: PathBuf,
    audit: AuditLog,
    diagnostic: String,
}

impl ModStore {
    /// Open (creating if needed) the store under `root`.
    ///
    /// The table is created only when the database file did not exist
    /// before; failing to create it is fatal for the caller.
    pub fn open(root: &Path) -> Result<Self, error::MhwimmError> {
        fs::create_dir_all(root).map_err(|e| {
            error::MhwimmError::PathError(format!("cannot create {}: {}", root.display(), e))
        })?;
        let db_path = mod_db_path(root);
        let fresh = !db_path.exists();

        let conn = db_connect(&db_path.to_string_lossy()).map_err(|e| {
            error::MhwimmError::DatabaseInitializationError(format!(
                "failed to open {}: {}",
                db_path.display(),
                e
            ))
        })?;

        if fresh {
            conn.execute(schemas::MOD_DB_SCHEMA, []).map_err(|e| {
                error::MhwimmError::DatabaseInitializationError(format!(
                    "failed to create table {}: {}",
                    schemas::MOD_TABLE,
                    e
                ))
            })?;
            tracing::info!(db = %db_path.display(), "created mod store");
        }

        Ok(Self {
            conn,
            db_path,
            audit: AuditLog::new(root),
            diagnostic: "nil".to_string(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Diagnostic of the most recent call.
    pub fn last_diagnostic(&self) -> &str {
        &self.diagnostic
    }

    /// Records matching every set field of `filter`, in insertion order.
    pub fn ask(&mut self, filter: &RecordFilter) -> Result<Vec<ModRecord>, StoreError> {
        let result = select(&self.conn, filter).map_err(StoreError::Ask);
        let rows = result.as_ref().map(|r| r.len()).unwrap_or(0);
        self.finish("ask", filter.mod_name.as_deref(), rows, result)
    }

    /// Insert one record. An incomplete filter is rejected before any SQL runs.
    pub fn add(&mut self, record: RecordFilter) -> Result<(), StoreError> {
        self.add_all(vec![record]).map(|_| ())
    }

    /// Insert every record inside one transaction: either all rows land or
    /// none do.
    pub fn add_all(&mut self, records: Vec<RecordFilter>) -> Result<usize, StoreError> {
        let mod_name = records.first().and_then(|r| r.mod_name.clone());
        let result = records
            .into_iter()
            .map(ModRecord::try_from)
            .collect::<Result<Vec<_>, _>>()
            .and_then(|records| insert_all(&mut self.conn, &records).map_err(StoreError::Add));
        let rows = *result.as_ref().unwrap_or(&0);
        self.finish("add", mod_name.as_deref(), rows, result)
    }

    /// Delete every record in `scope`, returning how many went away.
    pub fn delete(&mut self, scope: &DeleteScope) -> Result<usize, StoreError> {
        let result = remove(&self.conn, scope).map_err(StoreError::Delete);
        let rows = *result.as_ref().unwrap_or(&0);
        self.finish("delete", Some(scope.name()), rows, result)
    }

    fn finish<T>(
        &mut self,
        op: &str,
        mod_name: Option<&str>,
        rows: usize,
        result: Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        match &result {
            Ok(_) => {
                self.diagnostic = "ok".to_string();
                tracing::debug!(op, mod_name, rows, "store op succeeded");
            }
            Err(e) => {
                self.diagnostic = e.to_string();
                tracing::error!(op, mod_name, error = %e, "store op failed");
            }
        }
        let diag = result.as_ref().err().map(|_| self.diagnostic.as_str());
        if let Err(e) = self.audit.log_event(op, mod_name, rows, diag) {
            tracing::warn!(log = %self.audit.path().display(), error = %e, "audit log write failed");
        }
        result
    }
}

fn where_clause(filter: &RecordFilter) -> (String, Vec<&str>) {
    let mut terms = Vec::new();
    let mut values = Vec::new();
    for (column, value) in [
        ("mod_name", &filter.mod_name),
        ("mod_path", &filter.relative_path),
        ("install_date", &filter.installed_at),
    ] {
        if let Some(v) = value {
            values.push(v.as_str());
            terms.push(format!("{} = ?{}", column, values.len()));
        }
    }
    if terms.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", terms.join(" AND ")), values)
    }
}

fn select(conn: &Connection, filter: &RecordFilter) -> rusqlite::Result<Vec<ModRecord>> {
    let (clause, values) = where_clause(filter);
    let sql = format!(
        "SELECT mod_name, mod_path, install_date FROM {}{} ORDER BY rowid",
        schemas::MOD_TABLE,
        clause
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), |row| {
        Ok(ModRecord {
            mod_name: row.get(0)?,
            relative_path: row.get(1)?,
            installed_at: row.get(2)?,
        })
    })?;

    let mut results = Vec::new();
    for r in rows {
        results.push(r?);
    }
    Ok(results)
}

fn insert_all(conn: &mut Connection, records: &[ModRecord]) -> rusqlite::Result<usize> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} (mod_name, mod_path, install_date) VALUES (?1, ?2, ?3)",
            schemas::MOD_TABLE
        ))?;
        for r in records {
            stmt.execute(params![r.mod_name, r.relative_path, r.installed_at])?;
        }
    }
    tx.commit()?;
    Ok(records.len())
}

fn remove(conn: &Connection, scope: &DeleteScope) -> rusqlite::Result<usize> {
    let mut filter = RecordFilter::for_mod(scope.name());
    if let Some(path) = scope.relative_path() {
        filter = filter.with_path(path);
    }
    let (clause, values) = where_clause(&filter);
    conn.execute(
        &format!("DELETE FROM {}{}", schemas::MOD_TABLE, clause),
        params_from_iter(values),
    )
}
