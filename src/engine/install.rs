//! Linking a staged mod tree into the install root.

use crate::core::error::CommandError;
use crate::engine::effects::{Effect, EffectLog};
use std::fs;
use std::io;
use std::path::Path;

/// Create every staged directory under `target`, then hard-link every staged
/// regular file from `source` to the same relative path under `target`.
///
/// Directories that already exist are reused and left out of the log. On the
/// first failure everything this call created is rolled back before the
/// error is returned, so the filesystem is left as it was found.
pub fn link_tree(
    source: &Path,
    target: &Path,
    directories: &[String],
    regular_files: &[String],
) -> Result<EffectLog, CommandError> {
    let mut log = EffectLog::new();

    for dir in directories {
        let path = target.join(dir);
        match fs::create_dir(&path) {
            Ok(()) => log.record(Effect::CreatedDir(path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(abort(log, format!("failed to create directory {}: {}", dir, e)));
            }
        }
    }

    for file in regular_files {
        let path = target.join(file);
        if let Err(e) = fs::hard_link(source.join(file), &path) {
            return Err(abort(log, format!("failed to link {}: {}", file, e)));
        }
        log.record(Effect::LinkedFile(path));
    }

    tracing::debug!(target = %target.display(), effects = log.len(), "mod tree linked");
    Ok(log)
}

fn abort(log: EffectLog, reason: String) -> CommandError {
    let leftovers = log.rollback();
    if leftovers.is_empty() {
        CommandError::effect(format!("{}; install rolled back.", reason))
    } else {
        CommandError::effect(format!(
            "{}; rollback left {} paths behind.",
            reason,
            leftovers.len()
        ))
    }
}
