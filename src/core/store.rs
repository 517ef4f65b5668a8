//! Record types for the installed-mods store.
//!
//! A [`ModRecord`] is one installed path of one mod. Queries take a
//! [`RecordFilter`] whose fields are ANDed together; deletes take a
//! [`DeleteScope`], which cannot be built without a mod name.

use crate::core::error::StoreError;

/// One installed file or directory of a mod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModRecord {
    pub mod_name: String,
    /// Path relative to the mod directory and to the install root, `/`-separated.
    pub relative_path: String,
    /// Shared by every record of one install, e.g. `1771220592Z`.
    pub installed_at: String,
}

/// Partial record used as a query predicate or as an insert template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub mod_name: Option<String>,
    pub relative_path: Option<String>,
    pub installed_at: Option<String>,
}

impl RecordFilter {
    /// Matches every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_mod(name: impl Into<String>) -> Self {
        Self {
            mod_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.relative_path = Some(path.into());
        self
    }

    pub fn with_installed_at(mut self, ts: impl Into<String>) -> Self {
        self.installed_at = Some(ts.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mod_name.is_none() && self.relative_path.is_none() && self.installed_at.is_none()
    }
}

impl TryFrom<RecordFilter> for ModRecord {
    type Error = StoreError;

    fn try_from(filter: RecordFilter) -> Result<Self, Self::Error> {
        Ok(ModRecord {
            mod_name: filter
                .mod_name
                .ok_or(StoreError::Incomplete { field: "mod_name" })?,
            relative_path: filter
                .relative_path
                .ok_or(StoreError::Incomplete { field: "relative_path" })?,
            installed_at: filter
                .installed_at
                .ok_or(StoreError::Incomplete { field: "installed_at" })?,
        })
    }
}

/// Predicate for deletes. Always scoped to one mod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteScope {
    mod_name: String,
    relative_path: Option<String>,
}

impl DeleteScope {
    pub fn mod_name(name: impl Into<String>) -> Self {
        Self {
            mod_name: name.into(),
            relative_path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.relative_path = Some(path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.mod_name
    }

    pub fn relative_path(&self) -> Option<&str> {
        self.relative_path.as_deref()
    }
}
