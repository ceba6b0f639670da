//! Loaded plugin surfaces and the tag-alias collision map.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use crate::surface::{PluginState, Surface};

/// `(alias, command)` pairs that more than one plugin answers to.
///
/// Built once after all plugins have loaded. Reloading plugins requires a
/// new map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionMap {
    /// alias -> command -> tags of every plugin defining it under that alias.
    aliases: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    duplicate_tags: BTreeSet<String>,
}

impl CollisionMap {
    /// Pairwise scan over `plugins`.
    pub fn compute(plugins: &[Arc<Surface>]) -> Self {
        let mut map = Self::default();

        for (i, a) in plugins.iter().enumerate() {
            for b in &plugins[i + 1..] {
                if a.tag() == b.tag() {
                    error!(tag = a.tag(), "two plugins share the same tag");
                    map.duplicate_tags.insert(a.tag().to_string());
                }

                let (Some(alias), Some(other)) = (a.tag_alias(), b.tag_alias()) else {
                    continue;
                };
                if alias != other {
                    continue;
                }

                for command in a.registry().names() {
                    if !b.is_command(command) {
                        continue;
                    }
                    let tags = map
                        .aliases
                        .entry(alias.to_string())
                        .or_default()
                        .entry(command.to_string())
                        .or_default();
                    for tag in [a.tag(), b.tag()] {
                        if !tags.iter().any(|t| t == tag) {
                            tags.push(tag.to_string());
                        }
                    }
                    warn!(alias, command, tags = ?tags, "plugin command collision");
                }
            }
        }

        map
    }

    /// Tags colliding on `alias command`, if that pair is ambiguous.
    pub fn lookup(&self, alias: &str, command: &str) -> Option<&[String]> {
        self.aliases
            .get(alias)
            .and_then(|commands| commands.get(command))
            .map(Vec::as_slice)
    }

    /// Commands that are ambiguous under `alias`.
    pub fn commands_for(&self, alias: &str) -> Vec<&str> {
        self.aliases
            .get(alias)
            .map(|commands| commands.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn is_duplicate_tag(&self, tag: &str) -> bool {
        self.duplicate_tags.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty() && self.duplicate_tags.is_empty()
    }
}

/// Where a `(tag, command)` pair leads.
#[derive(Debug)]
pub enum Route<'a> {
    Found(&'a Arc<Surface>),
    /// Some plugin answers to the tag, none of them defines the command.
    UnknownCommand,
    UnknownTag,
}

/// All loaded plugin surfaces, in load order.
#[derive(Debug, Default)]
pub struct PluginHost {
    plugins: Vec<Arc<Surface>>,
    collisions: CollisionMap,
}

impl PluginHost {
    /// Take ownership of the loaded surfaces and precompute collisions.
    pub fn new(plugins: Vec<Surface>) -> Self {
        let plugins: Vec<Arc<Surface>> = plugins.into_iter().map(Arc::new).collect();
        let collisions = CollisionMap::compute(&plugins);
        info!(plugins = plugins.len(), "plugin host ready");
        Self {
            plugins,
            collisions,
        }
    }

    pub fn plugins(&self) -> &[Arc<Surface>] {
        &self.plugins
    }

    pub fn collisions(&self) -> &CollisionMap {
        &self.collisions
    }

    /// First plugin whose tag is `name`, else the first whose alias is.
    pub fn find(&self, name: &str) -> Option<&Arc<Surface>> {
        self.plugins
            .iter()
            .find(|p| p.tag() == name)
            .or_else(|| self.plugins.iter().find(|p| p.tag_alias() == Some(name)))
    }

    /// Plugin answering to `tag` that defines `command`. Tag matches win over
    /// alias matches.
    pub fn route(&self, tag: &str, command: &str) -> Route<'_> {
        let by_tag = self.plugins.iter().filter(|p| p.tag() == tag);
        let by_alias = self
            .plugins
            .iter()
            .filter(|p| p.tag() != tag && p.tag_alias() == Some(tag));

        let mut answered = false;
        for plugin in by_tag.chain(by_alias) {
            answered = true;
            if plugin.is_command(command) {
                return Route::Found(plugin);
            }
        }

        if answered {
            Route::UnknownCommand
        } else {
            Route::UnknownTag
        }
    }

    /// Set the state of the plugin answering to `name`. Returns the tag and
    /// previous state, or `None` when no plugin answers.
    pub fn set_state(&self, name: &str, state: PluginState) -> Option<(String, PluginState)> {
        let plugin = self.find(name)?;
        let previous = plugin.set_state(state);
        Some((plugin.tag().to_string(), previous))
    }

    /// Initialize every plugin in load order, stopping at the first failure.
    pub async fn initialize_all(&self) -> anyhow::Result<()> {
        for plugin in &self.plugins {
            plugin
                .initialize()
                .await
                .with_context(|| format!("initialize plugin `{}`", plugin.tag()))?;
        }
        Ok(())
    }
}
