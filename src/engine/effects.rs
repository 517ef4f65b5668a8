//! Append-only log of filesystem effects applied by one install attempt.
//!
//! Rollback replays the log newest first, so files are unlinked before the
//! directories holding them and children before parents.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// A directory this attempt created. Pre-existing directories are never logged.
    CreatedDir(PathBuf),
    /// A hard link this attempt created.
    LinkedFile(PathBuf),
}

impl Effect {
    pub fn path(&self) -> &Path {
        match self {
            Effect::CreatedDir(p) | Effect::LinkedFile(p) => p,
        }
    }

    fn undo(&self) -> io::Result<()> {
        let result = match self {
            Effect::CreatedDir(p) => fs::remove_dir(p),
            Effect::LinkedFile(p) => fs::remove_file(p),
        };
        match result {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EffectLog {
    applied: Vec<Effect>,
}

impl EffectLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, effect: Effect) {
        self.applied.push(effect);
    }

    pub fn len(&self) -> usize {
        self.applied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.applied.iter()
    }

    /// Undo every effect, newest first. Returns the effects that could not
    /// be undone; an already-missing path counts as undone.
    pub fn rollback(self) -> Vec<(Effect, io::Error)> {
        let mut failed = Vec::new();
        for effect in self.applied.into_iter().rev() {
            if let Err(e) = effect.undo() {
                tracing::warn!(path = %effect.path().display(), error = %e, "rollback step failed");
                failed.push((effect, e));
            }
        }
        failed
    }
}
