//! Removing an installed mod tree from the install root.

use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Removal {
    pub removed: usize,
    /// Relative paths that could not be removed, in the order they were tried.
    pub still_present: Vec<String>,
}

impl Removal {
    pub fn is_complete(&self) -> bool {
        self.still_present.is_empty()
    }
}

/// Unlink every regular file, then remove every directory deepest first.
///
/// A path that is already gone counts as removed. Any other failure leaves
/// the path in `still_present` and the walk carries on.
pub fn remove_tree(root: &Path, directories: &[String], regular_files: &[String]) -> Removal {
    let mut removal = Removal::default();

    for file in regular_files {
        tally(&mut removal, file, fs::remove_file(root.join(file)));
    }

    let mut ordered: Vec<&String> = directories.iter().collect();
    ordered.sort_by(|a, b| depth(b).cmp(&depth(a)).then_with(|| b.cmp(a)));
    for dir in ordered {
        tally(&mut removal, dir, fs::remove_dir(root.join(dir)));
    }

    removal
}

fn depth(path: &str) -> usize {
    path.split('/').count()
}

fn tally(removal: &mut Removal, path: &str, result: io::Result<()>) {
    match result {
        Ok(()) => removal.removed += 1,
        Err(e) if e.kind() == io::ErrorKind::NotFound => removal.removed += 1,
        Err(e) => {
            tracing::warn!(path, error = %e, "could not remove installed path");
            removal.still_present.push(path.to_string());
        }
    }
}
