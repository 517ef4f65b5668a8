//! Manager configuration stored as a flat `KEY=VALUE` file.
//!
//! Recognized keys are exactly `USERHOME`, `MHWIROOT` and `MHWIMMROOT`.
//! Unknown keys and lines without `=` are dropped silently on load, and a
//! save always rewrites the whole file.

use crate::core::error::MhwimmError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_DIR_NAME: &str = ".mhwimm";
pub const CONFIG_FILE_NAME: &str = "mhwimm_config";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    /// Home directory of the user running the manager.
    UserHome,
    /// Game install root; mods are linked under it.
    MhwiRoot,
    /// Manager data directory holding the store and its audit log.
    MhwimmRoot,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 3] = [ConfigKey::UserHome, ConfigKey::MhwiRoot, ConfigKey::MhwimmRoot];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::UserHome => "USERHOME",
            ConfigKey::MhwiRoot => "MHWIROOT",
            ConfigKey::MhwimmRoot => "MHWIMMROOT",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = MhwimmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| MhwimmError::ConfigError(format!("unknown config option '{}'", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Config {
    pub userhome: String,
    pub mhwiroot: String,
    pub mhwimmroot: String,
}

impl Config {
    /// Defaults derived from the user's home directory. The game root is left
    /// unset until the user configures it.
    pub fn defaults_for_home(home: &Path) -> Self {
        Self {
            userhome: home.to_string_lossy().into_owned(),
            mhwiroot: String::new(),
            mhwimmroot: home.join(CONFIG_DIR_NAME).to_string_lossy().into_owned(),
        }
    }

    pub fn get(&self, key: ConfigKey) -> &str {
        match key {
            ConfigKey::UserHome => &self.userhome,
            ConfigKey::MhwiRoot => &self.mhwiroot,
            ConfigKey::MhwimmRoot => &self.mhwimmroot,
        }
    }

    pub fn set(&mut self, key: ConfigKey, value: impl Into<String>) {
        let value = value.into();
        match key {
            ConfigKey::UserHome => self.userhome = value,
            ConfigKey::MhwiRoot => self.mhwiroot = value,
            ConfigKey::MhwimmRoot => self.mhwimmroot = value,
        }
    }

    /// Install root, if one is configured.
    pub fn install_root(&self) -> Option<PathBuf> {
        if self.mhwiroot.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.mhwiroot))
        }
    }

    pub fn data_root(&self) -> PathBuf {
        PathBuf::from(&self.mhwimmroot)
    }

    /// Apply every recognized `KEY=VALUE` line of `text` on top of `self`.
    pub fn merge_from_str(mut self, text: &str) -> Self {
        for line in text.lines() {
            let Some((name, value)) = line.split_once('=') else {
                continue;
            };
            if let Ok(key) = name.trim().parse::<ConfigKey>() {
                self.set(key, value.trim());
            }
        }
        self
    }

    pub fn render(&self) -> String {
        ConfigKey::ALL
            .into_iter()
            .map(|k| format!("{}={}\n", k, self.get(k)))
            .collect()
    }
}

pub fn config_path(home: &Path) -> PathBuf {
    home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// Load config from `path` on top of `defaults`.
///
/// A missing file yields `defaults`; an unreadable one is an error.
pub fn load_config(path: &Path, defaults: Config) -> Result<Config, MhwimmError> {
    if !path.exists() {
        return Ok(defaults);
    }
    let text = fs::read_to_string(path).map_err(|e| {
        MhwimmError::ConfigError(format!("failed to read {}: {}", path.display(), e))
    })?;
    Ok(defaults.merge_from_str(&text))
}

/// Rewrite `path` with the full contents of `config`.
pub fn save_config(config: &Config, path: &Path) -> Result<(), MhwimmError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(MhwimmError::IoError)?;
    }
    fs::write(path, config.render()).map_err(|e| {
        MhwimmError::ConfigError(format!("failed to write {}: {}", path.display(), e))
    })
}
