//! Iterator over the installable entries of a mod directory.

use std::path::{Component, Path};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    RegularFile,
}

/// One installable entry, relative to the mod directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModEntry {
    pub kind: EntryKind,
    /// `/`-separated, never empty, never starting with `/`.
    pub relative: String,
}

/// Walk `mod_dir` in pre-order (a directory before its contents), siblings
/// sorted by name. Symlinks are not followed and, like any other entry that
/// is neither a directory nor a regular file, are skipped.
pub fn mod_entries(mod_dir: &Path) -> impl Iterator<Item = Result<ModEntry, String>> + '_ {
    WalkDir::new(mod_dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => return Some(Err(format!("failed to traverse {}: {}", mod_dir.display(), e))),
            };
            let file_type = entry.file_type();
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::RegularFile
            } else {
                tracing::debug!(path = %entry.path().display(), "skipping non-regular entry");
                return None;
            };
            Some(relative_of(mod_dir, entry.path()).map(|relative| ModEntry { kind, relative }))
        })
}

fn relative_of(base: &Path, path: &Path) -> Result<String, String> {
    let rel = path
        .strip_prefix(base)
        .map_err(|_| format!("{} escapes {}", path.display(), base.display()))?;
    let mut parts = Vec::new();
    for component in rel.components() {
        let Component::Normal(part) = component else {
            return Err(format!("unexpected path component in {}", rel.display()));
        };
        let part = part
            .to_str()
            .ok_or_else(|| format!("non UTF-8 name in {}", rel.display()))?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}
