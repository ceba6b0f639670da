//! Plugin discovery and loading.
//!
//! Each plugin directory contains a `manifest.toml`:
//!
//! ```toml
//! name = "music"
//! version = "1.0.0"
//! kind = "music"     # factory in the plugin catalog
//! tag = "music"      # optional override of the plugin's default tag
//! alias = "m"        # optional override of the plugin's default alias
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use nyx_commands::{Platform, Plugin};
use nyx_types::PluginLoadConfig;

use crate::plugins::{MusicPlugin, TestPlugin};
use crate::voice::{VoiceEventBus, VoiceQueue};

/// File name of a plugin manifest inside its directory.
pub const MANIFEST_FILENAME: &str = "manifest.toml";

/// A plugin manifest loaded from `manifest.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginManifest {
    /// Plugin name, matched by the load filter. The disabled-plugin list
    /// stores the plugin's tag instead.
    pub name: String,
    pub version: String,
    /// Catalog key selecting the factory.
    pub kind: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
}

/// A manifest and the directory it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPlugin {
    pub manifest: PluginManifest,
    pub dir: PathBuf,
}

/// Services handed to plugin factories.
#[derive(Clone)]
pub struct PluginEnv {
    pub platform: Arc<dyn Platform>,
    pub voice: Arc<dyn VoiceQueue>,
    pub voice_events: Arc<VoiceEventBus>,
}

type Factory = dyn Fn(&PluginEnv, &PluginManifest) -> Result<Arc<dyn Plugin>> + Send + Sync;

/// Plugin factories keyed by manifest `kind`.
#[derive(Default)]
pub struct PluginCatalog {
    factories: BTreeMap<String, Box<Factory>>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the plugins shipped with the bot.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register("music", |env, manifest| {
            let plugin: Arc<dyn Plugin> = Arc::new(MusicPlugin::from_manifest(env, manifest));
            Ok(plugin)
        });
        catalog.register("test", |env, manifest| {
            let plugin: Arc<dyn Plugin> = Arc::new(TestPlugin::from_manifest(env, manifest));
            Ok(plugin)
        });
        catalog
    }

    /// Add or replace the factory for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&PluginEnv, &PluginManifest) -> Result<Arc<dyn Plugin>> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    fn create(&self, env: &PluginEnv, manifest: &PluginManifest) -> Result<Arc<dyn Plugin>> {
        let factory = self
            .factories
            .get(&manifest.kind)
            .with_context(|| format!("unknown plugin kind `{}`", manifest.kind))?;
        factory(env, manifest)
    }
}

impl std::fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("kinds", &self.kinds().collect::<Vec<_>>())
            .finish()
    }
}

/// A plugin instance ready to become a surface.
pub struct LoadedPlugin {
    pub name: String,
    pub manifest: PluginManifest,
    pub plugin: Arc<dyn Plugin>,
}

/// Scans directories for manifests and instantiates plugins from them.
#[derive(Debug, Default)]
pub struct PluginManager {
    discovered: Vec<DiscoveredPlugin>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan each directory's immediate subdirectories for manifests.
    ///
    /// Unreadable directories are skipped. Invalid manifests are logged and
    /// skipped. A name seen twice keeps the first manifest.
    pub fn scan_subdirs(&mut self, dirs: &[PathBuf]) -> &mut Self {
        for dir in dirs {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(dir = %dir.display(), error = %e, "skipping unreadable plugin directory");
                    continue;
                }
            };

            let mut subdirs: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_dir())
                .collect();
            subdirs.sort();

            for path in subdirs {
                let manifest_path = path.join(MANIFEST_FILENAME);
                if !manifest_path.exists() {
                    continue;
                }

                match Self::load_manifest(&manifest_path) {
                    Ok(manifest) => self.add(manifest, path),
                    Err(e) => {
                        warn!(
                            path = %manifest_path.display(),
                            error = %e,
                            "skipping plugin with invalid manifest"
                        );
                    }
                }
            }
        }
        self
    }

    /// Load a single plugin manifest from a TOML file.
    pub fn load_manifest(path: &Path) -> Result<PluginManifest> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read manifest: {}", path.display()))?;

        let manifest: PluginManifest = toml::from_str(&content)
            .with_context(|| format!("parse manifest: {}", path.display()))?;

        Ok(manifest)
    }

    /// Record a manifest without scanning.
    pub fn add(&mut self, manifest: PluginManifest, dir: PathBuf) {
        if self.find(&manifest.name).is_some() {
            warn!(name = %manifest.name, dir = %dir.display(), "ignoring duplicate plugin name");
            return;
        }
        debug!(name = %manifest.name, kind = %manifest.kind, "discovered plugin");
        self.discovered.push(DiscoveredPlugin { manifest, dir });
    }

    pub fn discovered(&self) -> &[DiscoveredPlugin] {
        &self.discovered
    }

    pub fn find(&self, name: &str) -> Option<&DiscoveredPlugin> {
        self.discovered.iter().find(|p| p.manifest.name == name)
    }

    /// Instantiate discovered plugins.
    ///
    /// `options.names` restricts and orders the plugins to load; without it
    /// every discovered plugin loads in discovery order. With `multi` unset
    /// loading stops after the first success. Failures are logged and skipped.
    pub fn load(
        &self,
        options: &PluginLoadConfig,
        catalog: &PluginCatalog,
        env: &PluginEnv,
    ) -> Vec<LoadedPlugin> {
        let names: Vec<&str> = match &options.names {
            Some(names) => names.iter().map(String::as_str).collect(),
            None => self.discovered.iter().map(|p| p.manifest.name.as_str()).collect(),
        };

        let mut loaded = Vec::new();
        for name in names {
            let Some(found) = self.find(name) else {
                warn!(name, "requested plugin was not discovered");
                continue;
            };

            match catalog.create(env, &found.manifest) {
                Ok(plugin) => {
                    info!(name, version = %found.manifest.version, tag = plugin.tag(), "loaded plugin");
                    loaded.push(LoadedPlugin {
                        name: name.to_string(),
                        manifest: found.manifest.clone(),
                        plugin,
                    });
                    if !options.multi {
                        break;
                    }
                }
                Err(e) => warn!(name, error = %e, "failed to instantiate plugin"),
            }
        }

        if loaded.is_empty() {
            warn!("No plugins were loaded.");
        }
        loaded
    }
}
