//! Command-line surface of the binary.
//!
//! The manager is driven by interactive commands read from stdin, so the
//! process itself only answers `--help` and `--version`.

use clap::Parser;

#[derive(Parser, Debug)]
#[clap(
    name = "mhwimm",
    version = env!("CARGO_PKG_VERSION"),
    about = "Monster Hunter World: Iceborne mod manager. Reads commands from stdin; type `help` at the prompt for the list.",
    after_help = "Configuration lives in $HOME/.mhwimm/mhwimm_config. Set RUST_LOG=mhwimm=debug for diagnostics on stderr."
)]
pub(crate) struct Cli {}
