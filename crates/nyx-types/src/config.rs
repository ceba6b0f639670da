//! Configuration types for a nyx bot instance.
//!
//! [`BotConfig`] is the top-level configuration loaded from `nyx.toml`,
//! controlling the command prefix, where plugins are discovered, which of them
//! are loaded, and the initial contents of the permission allowlists.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ids::{GuildId, RoleId, UserId};
use crate::NyxError;

/// Default configuration file name.
pub const CONFIG_FILENAME: &str = "nyx.toml";

/// Character that marks a message as a command unless configured otherwise.
pub const DEFAULT_PREFIX: char = '!';

/// Maximum config file size in bytes.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Top-level bot configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Command prefix character.
    pub prefix: char,
    /// Directories whose subdirectories are scanned for plugin manifests.
    pub plugin_dirs: Vec<PathBuf>,
    /// Which discovered plugins to instantiate.
    pub plugins: PluginLoadConfig,
    /// Initial allowlist contents.
    pub allowlist: AllowlistSeed,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX,
            plugin_dirs: Vec::new(),
            plugins: PluginLoadConfig::default(),
            allowlist: AllowlistSeed::default(),
        }
    }
}

/// Plugin load options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginLoadConfig {
    /// Restrict loading to these plugin names. `None` loads every discovered plugin.
    pub names: Option<Vec<String>>,
    /// Load every matching plugin (`true`) or only the first one found.
    pub multi: bool,
}

impl Default for PluginLoadConfig {
    fn default() -> Self {
        Self {
            names: None,
            multi: true,
        }
    }
}

/// Seed data for the registered-roles/users allowlists and the persisted
/// disabled-plugin list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowlistSeed {
    pub registered_roles: BTreeMap<GuildId, Vec<RoleId>>,
    pub registered_users: BTreeMap<GuildId, Vec<UserId>>,
    pub disabled_plugins: Vec<String>,
}

impl BotConfig {
    /// Parse a configuration from TOML text and validate it.
    pub fn from_toml(content: &str) -> Result<Self, NyxError> {
        let config: BotConfig =
            toml::from_str(content).map_err(|e| NyxError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    ///
    /// Relative `plugin_dirs` are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, NyxError> {
        let size = std::fs::metadata(path)?.len();
        if size > MAX_CONFIG_FILE_SIZE {
            return Err(NyxError::Config(format!(
                "{} is {size} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;

        if let Some(base) = path.parent() {
            for dir in &mut config.plugin_dirs {
                if dir.is_relative() {
                    *dir = base.join(&*dir);
                }
            }
        }

        Ok(config)
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), NyxError> {
        if self.prefix.is_whitespace() || self.prefix.is_alphanumeric() {
            return Err(NyxError::Config(format!(
                "prefix {:?} must be a symbol, not whitespace or alphanumeric",
                self.prefix
            )));
        }

        if let Some(names) = &self.plugins.names {
            if names.iter().any(|n| n.trim().is_empty()) {
                return Err(NyxError::Config("plugin names must not be empty".into()));
            }
        }

        Ok(())
    }
}
