//! Scratch lists exchanged between the command engine and the store worker.
//!
//! The engine fills the path lists while walking a mod directory, the store
//! worker fills them when answering a lookup. Whoever currently holds the
//! engine/store turn is the only one touching the area; the mutex makes that
//! explicit and guards are never held across a hand-off.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StagingArea {
    /// Relative directory paths, parents before children.
    pub directories: Vec<String>,
    /// Relative regular-file paths.
    pub regular_files: Vec<String>,
    /// Mod names, first-seen order, no duplicates.
    pub mod_names: Vec<String>,
}

impl StagingArea {
    pub fn clear(&mut self) {
        self.directories.clear();
        self.regular_files.clear();
        self.mod_names.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.regular_files.is_empty() && self.mod_names.is_empty()
    }

    pub fn clear_paths(&mut self) {
        self.directories.clear();
        self.regular_files.clear();
    }

    /// Record a mod name unless it is already present.
    pub fn push_mod_name(&mut self, name: &str) {
        if !self.mod_names.iter().any(|n| n == name) {
            self.mod_names.push(name.to_string());
        }
    }
}

/// Shared handle to the staging area.
#[derive(Debug, Clone, Default)]
pub struct SharedStaging(Arc<Mutex<StagingArea>>);

impl SharedStaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the area. A poisoned lock still yields the data: every writer
    /// leaves the lists in a valid (if partial) state and the next cycle
    /// clears them anyway.
    pub fn lock(&self) -> MutexGuard<'_, StagingArea> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
