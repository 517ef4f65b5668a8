//! Command engine: parses one input line, validates it and executes it.
//!
//! The engine never talks to the store itself. The session asks it which
//! request to post before execution ([`CommandEngine::before_request`]) and
//! after it ([`CommandEngine::after_request`]), relays the replies back, and
//! finally pulls the buffered output with
//! [`CommandEngine::next_output_line`].
//!
//! Every failure is recorded as the single `error: ...` output line and moves
//! the engine to [`EngineStatus::Error`]; the returned [`CommandError`] only
//! tells the session to cut the cycle short.

pub mod effects;
pub mod install;
pub mod uninstall;
pub mod walk;

use crate::core::config::{Config, ConfigKey};
use crate::core::error::CommandError;
use crate::core::shutdown::Shutdown;
use crate::core::staging::SharedStaging;
use crate::core::store::{DeleteScope, RecordFilter};
use crate::core::time;
use crate::core::worker::{Interest, StoreReply, StoreRequest};
use effects::EffectLog;
use std::fs;
use std::path::{Path, PathBuf};
use uninstall::Removal;
use walk::EntryKind;

pub const HELP_LINES: [&str; 8] = [
    "cd <path>                  change the working directory",
    "ls                         list the working directory",
    "install <mod> <mod_dir>    link <mod_dir> into MHWIROOT as <mod>",
    "uninstall <mod>            remove a mod; shared directories stay, reported as still present",
    "installed                  list installed mods",
    "config <KEY>=<value>       set USERHOME, MHWIROOT or MHWIMMROOT",
    "commands, help             show this list",
    "exit                       quit",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Unknown keyword or empty line. Executes as a silent no-op.
    Nop,
    Cd,
    List,
    Install,
    Uninstall,
    ListInstalled,
    SetConfig,
    Help,
    Exit,
}

impl Command {
    pub fn from_keyword(word: &str) -> Self {
        match word {
            "cd" => Command::Cd,
            "ls" => Command::List,
            "install" => Command::Install,
            "uninstall" => Command::Uninstall,
            "installed" => Command::ListInstalled,
            "config" => Command::SetConfig,
            "commands" | "help" => Command::Help,
            "exit" => Command::Exit,
            _ => Command::Nop,
        }
    }

    /// Parameter count expected on the input line.
    pub fn arity(self) -> usize {
        match self {
            Command::Cd | Command::Uninstall | Command::SetConfig => 1,
            Command::Install => 2,
            Command::Nop | Command::List | Command::ListInstalled | Command::Help | Command::Exit => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Idle,
    Working,
    Error,
}

/// Local half of an install waiting for its records to be committed.
#[derive(Debug)]
struct PendingInstall {
    installed_at: String,
    files: usize,
    directories: usize,
    effects: EffectLog,
}

pub struct CommandEngine {
    config: Config,
    work_dir: PathBuf,
    staging: SharedStaging,
    shutdown: Shutdown,
    command: Command,
    status: EngineStatus,
    params: Vec<String>,
    output: Vec<String>,
    cursor: usize,
    install_root: Option<PathBuf>,
    pending: Option<PendingInstall>,
    removal: Option<Removal>,
}

impl CommandEngine {
    pub fn new(config: Config, work_dir: PathBuf, staging: SharedStaging, shutdown: Shutdown) -> Self {
        Self {
            config,
            work_dir,
            staging,
            shutdown,
            command: Command::Nop,
            status: EngineStatus::Idle,
            params: Vec::new(),
            output: Vec::new(),
            cursor: 0,
            install_root: None,
            pending: None,
            removal: None,
        }
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Forget the previous command. Called at the top of every cycle.
    pub fn reset(&mut self) {
        self.command = Command::Nop;
        self.status = EngineStatus::Idle;
        self.params.clear();
        self.output.clear();
        self.cursor = 0;
        self.install_root = None;
        self.pending = None;
        self.removal = None;
    }

    /// Select the command and check its parameters. No side effects.
    pub fn parse(&mut self, line: &str) -> Result<Command, CommandError> {
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            return Ok(Command::Nop);
        };
        let command = Command::from_keyword(keyword);
        if command == Command::Nop {
            tracing::debug!(keyword, "unknown command ignored");
            return Ok(command);
        }
        self.command = command;
        let params: Vec<String> = tokens.map(str::to_string).collect();
        if params.len() != command.arity() {
            return Err(self.fail(CommandError::validation("incorrect format.")));
        }

        self.params = match command {
            Command::SetConfig => {
                let pair = &params[0];
                if pair.matches('=').count() != 1 {
                    return Err(self.fail(CommandError::validation("incorrect format.")));
                }
                match pair.split_once('=') {
                    Some((key, value)) if !key.is_empty() => vec![key.to_string(), value.to_string()],
                    _ => return Err(self.fail(CommandError::validation("incorrect format."))),
                }
            }
            Command::Install if Path::new(&params[1]).is_absolute() => {
                return Err(self.fail(CommandError::validation(
                    "mod directory must be relative to the working directory.",
                )));
            }
            _ => params,
        };
        Ok(command)
    }

    /// Store lookup required before executing, if any.
    pub fn before_request(&mut self) -> Result<Option<StoreRequest>, CommandError> {
        let request = match self.command {
            Command::Install => {
                let root = self.resolve_install_root()?;
                let mod_dir = self.work_dir.join(&self.params[1]);
                if !mod_dir.is_dir() {
                    let msg = format!("{} is not a directory.", self.params[1]);
                    return Err(self.fail(CommandError::validation(msg)));
                }
                self.install_root = Some(root);
                StoreRequest::Ask {
                    filter: RecordFilter::for_mod(&self.params[0]),
                    interest: Interest::ModNames,
                }
            }
            Command::Uninstall => {
                let root = self.resolve_install_root()?;
                self.install_root = Some(root.clone());
                StoreRequest::Ask {
                    filter: RecordFilter::for_mod(&self.params[0]),
                    interest: Interest::Paths { classify_under: root },
                }
            }
            Command::ListInstalled => StoreRequest::Ask {
                filter: RecordFilter::all(),
                interest: Interest::ModNames,
            },
            _ => return Ok(None),
        };
        self.status = EngineStatus::Working;
        Ok(Some(request))
    }

    /// Inspect the reply to [`CommandEngine::before_request`].
    pub fn check_lookup(&mut self, reply: &StoreReply) -> Result<(), CommandError> {
        if !reply.ok {
            return Err(self.fail(CommandError::store(reply.diagnostic.clone())));
        }
        match self.command {
            Command::Install if reply.rows > 0 => {
                Err(self.fail(CommandError::validation("mod already installed.")))
            }
            Command::Uninstall if reply.rows == 0 => {
                let msg = format!("mod {} is not installed.", self.params[0]);
                Err(self.fail(CommandError::validation(msg)))
            }
            _ => Ok(()),
        }
    }

    /// Run the command's local effect.
    pub fn execute(&mut self) -> Result<(), CommandError> {
        self.status = EngineStatus::Working;
        let result = match self.command {
            Command::Nop => Ok(()),
            Command::Cd => self.change_dir(),
            Command::List => self.list_dir(),
            Command::Install => self.install(),
            Command::Uninstall => {
                self.uninstall();
                Ok(())
            }
            Command::ListInstalled => {
                let names = self.staging.lock().mod_names.clone();
                if names.is_empty() {
                    self.emit("no mods installed");
                }
                for name in names {
                    self.emit(name);
                }
                Ok(())
            }
            Command::SetConfig => self.set_config(),
            Command::Help => {
                for line in HELP_LINES {
                    self.emit(line);
                }
                Ok(())
            }
            Command::Exit => {
                self.shutdown.trigger();
                Ok(())
            }
        };
        match result {
            Ok(()) => {
                if self.status == EngineStatus::Working {
                    self.status = EngineStatus::Idle;
                }
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Store mutation required after a successful execution, if any.
    pub fn after_request(&self) -> Option<StoreRequest> {
        match self.command {
            Command::Install => self.pending.as_ref().map(|p| StoreRequest::Add {
                template: RecordFilter::for_mod(&self.params[0]).with_installed_at(&p.installed_at),
            }),
            Command::Uninstall if self.removal.is_some() => Some(StoreRequest::Del {
                scope: DeleteScope::mod_name(&self.params[0]),
            }),
            _ => None,
        }
    }

    /// Inspect the reply to [`CommandEngine::after_request`] and produce the
    /// final output of the command.
    ///
    /// After a failed install commit the local links are still in place; the
    /// session must follow up with [`CommandEngine::compensating_request`]
    /// and [`CommandEngine::compensate_install`].
    pub fn check_commit(&mut self, reply: &StoreReply) -> Result<(), CommandError> {
        match self.command {
            Command::Install => {
                if !reply.ok {
                    return Err(self.fail(CommandError::store(reply.diagnostic.clone())));
                }
                if let Some(p) = self.pending.take() {
                    let line = format!(
                        "installed {} ({} files, {} directories)",
                        self.params[0], p.files, p.directories
                    );
                    self.emit(line);
                }
                Ok(())
            }
            Command::Uninstall => {
                let removal = self.removal.take().unwrap_or_default();
                let mut first_error = None;
                if !reply.ok {
                    first_error = Some(self.fail(CommandError::store(reply.diagnostic.clone())));
                }
                if !removal.is_complete() {
                    let msg = format!(
                        "failed to remove {} paths of mod {}; still present:",
                        removal.still_present.len(),
                        self.params[0]
                    );
                    let err = self.fail(CommandError::effect(msg));
                    for path in removal.still_present {
                        self.emit(format!("  {}", path));
                    }
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
                match first_error {
                    Some(err) => Err(err),
                    None => {
                        self.emit(format!("uninstalled {}", self.params[0]));
                        Ok(())
                    }
                }
            }
            _ => Ok(()),
        }
    }

    /// Store request undoing a partially committed install.
    pub fn compensating_request(&self) -> Option<StoreRequest> {
        match (self.command, &self.pending) {
            (Command::Install, Some(_)) => Some(StoreRequest::Del {
                scope: DeleteScope::mod_name(&self.params[0]),
            }),
            _ => None,
        }
    }

    pub fn check_compensation(&mut self, reply: &StoreReply) {
        if !reply.ok {
            self.status = EngineStatus::Error;
            self.emit(format!("error: failed to undo partial records: {}", reply.diagnostic));
        }
    }

    /// Remove every link and directory the pending install created. No-op
    /// when nothing is pending.
    pub fn compensate_install(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let leftovers = pending.effects.rollback();
        if !leftovers.is_empty() {
            self.status = EngineStatus::Error;
            self.emit(format!(
                "error: rollback left {} paths behind.",
                leftovers.len()
            ));
        }
    }

    /// Next buffered output line. Once exhausted, returns `None` and rewinds.
    pub fn next_output_line(&mut self) -> Option<String> {
        match self.output.get(self.cursor) {
            Some(line) => {
                self.cursor += 1;
                Some(line.clone())
            }
            None => {
                self.cursor = 0;
                None
            }
        }
    }

    fn emit(&mut self, line: impl Into<String>) {
        self.output.push(line.into());
    }

    fn fail(&mut self, err: CommandError) -> CommandError {
        tracing::debug!(command = ?self.command, error = %err, "command failed");
        self.status = EngineStatus::Error;
        self.output.push(err.to_string());
        err
    }

    fn resolve_install_root(&mut self) -> Result<PathBuf, CommandError> {
        let Some(root) = self.config.install_root() else {
            return Err(self.fail(CommandError::validation("MHWIROOT is not configured.")));
        };
        if !root.is_dir() {
            let msg = format!("MHWIROOT {} is not a directory.", root.display());
            return Err(self.fail(CommandError::validation(msg)));
        }
        Ok(root)
    }

    fn change_dir(&mut self) -> Result<(), CommandError> {
        match fs::canonicalize(self.work_dir.join(&self.params[0])) {
            Ok(dir) if dir.is_dir() => {
                self.work_dir = dir;
                Ok(())
            }
            _ => Err(CommandError::effect("failed to change directory.")),
        }
    }

    fn list_dir(&mut self) -> Result<(), CommandError> {
        let entries = fs::read_dir(&self.work_dir)
            .map_err(|_| CommandError::effect("failed to list directory."))?;
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        if names.is_empty() {
            self.emit("(empty directory)");
        }
        for name in names {
            self.emit(name);
        }
        Ok(())
    }

    fn install(&mut self) -> Result<(), CommandError> {
        let Some(root) = self.install_root.clone() else {
            return Err(CommandError::validation("MHWIROOT is not configured."));
        };
        let mod_dir = self.work_dir.join(&self.params[1]);

        let (directories, regular_files) = {
            let mut staging = self.staging.lock();
            staging.clear_paths();
            for entry in walk::mod_entries(&mod_dir) {
                let entry = entry.map_err(|e| CommandError::effect(format!("{}.", e)))?;
                match entry.kind {
                    EntryKind::Directory => staging.directories.push(entry.relative),
                    EntryKind::RegularFile => staging.regular_files.push(entry.relative),
                }
            }
            (staging.directories.clone(), staging.regular_files.clone())
        };
        if regular_files.is_empty() {
            return Err(CommandError::validation(format!(
                "no files to install in {}.",
                self.params[1]
            )));
        }

        let effects = install::link_tree(&mod_dir, &root, &directories, &regular_files)?;
        self.pending = Some(PendingInstall {
            installed_at: time::now_epoch_z(),
            files: regular_files.len(),
            directories: directories.len(),
            effects,
        });
        Ok(())
    }

    fn uninstall(&mut self) {
        let Some(root) = self.install_root.clone() else {
            return;
        };
        let (directories, regular_files) = {
            let staging = self.staging.lock();
            (staging.directories.clone(), staging.regular_files.clone())
        };
        let removal = uninstall::remove_tree(&root, &directories, &regular_files);
        tracing::debug!(
            mod_name = %self.params[0],
            removed = removal.removed,
            still_present = removal.still_present.len(),
            "mod tree removed"
        );
        self.removal = Some(removal);
    }

    fn set_config(&mut self) -> Result<(), CommandError> {
        let key: ConfigKey = self.params[0]
            .parse()
            .map_err(|_| CommandError::validation("unknown config option."))?;
        self.config.set(key, self.params[1].as_str());
        let line = format!("{}={}", key, self.config.get(key));
        self.emit(line);
        Ok(())
    }
}
