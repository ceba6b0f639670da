pub mod console;
pub mod plugins;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use nyx_types::{BotConfig, CONFIG_FILENAME};

/// Load the configuration named on the command line, falling back to
/// `./nyx.toml` and then to defaults. Extra plugin directories are appended.
pub fn load_config(path: Option<&Path>, extra_dirs: Vec<PathBuf>) -> Result<BotConfig> {
    let mut config = match path {
        Some(path) => BotConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            let local = Path::new(CONFIG_FILENAME);
            if local.is_file() {
                BotConfig::load(local)
                    .with_context(|| format!("failed to load config {}", local.display()))?
            } else {
                debug!("no config file, using defaults");
                BotConfig::default()
            }
        }
    };
    config.plugin_dirs.extend(extra_dirs);
    Ok(config)
}
