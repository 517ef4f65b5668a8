//! mhwimm: a mod manager for Monster Hunter World: Iceborne.
//!
//! Mods are plain directory trees. Installing one hard-links every file into
//! the game directory (`MHWIROOT`) and records each linked path in a local
//! SQLite store, so that the mod can later be removed exactly.
//!
//! # Architecture
//!
//! Three loops cooperate, each pair through a strict two-party rendezvous
//! ([`core::rendezvous`]):
//!
//! - **Front-end** ([`frontend`]): prompts, reads a line, prints the output.
//! - **Engine** ([`session`], [`engine`]): parses and validates the command,
//!   applies the filesystem effect, and rolls it back when a later step
//!   fails.
//! - **Store worker** ([`core::worker`]): the only writer of the store.
//!
//! Exactly one role of a pair is active at any time, and a command cycle
//! finishes (output drained) before the next one starts. An install is
//! atomic end to end: either every link and every record exist, or none do.
//!
//! # Commands
//!
//! ```text
//! mhwimm: config MHWIROOT=/games/mhw
//! mhwimm: cd /home/hunter/mods
//! mhwimm: install sword sword
//!         installed sword (2 files, 1 directories)
//! mhwimm: installed
//!         sword
//! mhwimm: uninstall sword
//!         uninstalled sword
//! mhwimm: exit
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: rendezvous, staging area, store, configuration, shutdown
//! - [`engine`]: command parsing and execution
//! - [`session`]: per-cycle orchestration and thread startup
//! - [`frontend`]: the interactive prompt

pub mod core;
pub mod engine;
pub mod frontend;
pub mod session;

mod cli;

use crate::cli::Cli;
use crate::core::config::{self, Config};
use crate::core::db::ModStore;
use crate::core::error::MhwimmError;
use crate::core::logging;
use crate::core::shutdown::Shutdown;
use crate::session::SessionOptions;
use clap::Parser;
use std::env;
use std::io::{self, BufReader};
use std::path::PathBuf;

fn home_dir() -> Result<PathBuf, MhwimmError> {
    env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| MhwimmError::NotFound("HOME is not set".to_string()))
}

pub fn run() -> Result<(), MhwimmError> {
    let _cli = Cli::parse();
    logging::init();

    let home = home_dir()?;
    let config_path = config::config_path(&home);
    let config = config::load_config(&config_path, Config::defaults_for_home(&home))?;
    let store = ModStore::open(&config.data_root())?;
    tracing::info!(
        config = %config_path.display(),
        db = %store.db_path().display(),
        "starting"
    );

    let shutdown = Shutdown::new();
    let _signals = shutdown.register_signals()?;
    let options = SessionOptions::new(env::current_dir()?);

    let mut stdout = io::stdout();
    let config = session::launch(
        config,
        store,
        options,
        &shutdown,
        BufReader::new(io::stdin()),
        &mut stdout,
    )?;

    config::save_config(&config, &config_path)
}
