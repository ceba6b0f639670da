//! `nyx plugins` and `nyx validate`.

use anyhow::{bail, Result};

use nyx_bot::{PluginCatalog, PluginManager};
use nyx_types::BotConfig;

fn discover(config: &BotConfig) -> PluginManager {
    let mut manager = PluginManager::new();
    manager.scan_subdirs(&config.plugin_dirs);
    manager
}

/// Run `nyx plugins`.
pub fn list(config: &BotConfig) -> Result<()> {
    let manager = discover(config);
    if manager.discovered().is_empty() {
        println!("No plugin manifests found.");
        return Ok(());
    }

    println!("{:<20} {:<10} {:<10} {}", "NAME", "VERSION", "KIND", "DIRECTORY");
    for plugin in manager.discovered() {
        let m = &plugin.manifest;
        println!(
            "{:<20} {:<10} {:<10} {}",
            m.name,
            m.version,
            m.kind,
            plugin.dir.display()
        );
    }
    Ok(())
}

/// Run `nyx validate`.
///
/// The config itself was validated on load; this checks that every plugin
/// the config asks for exists and has a known kind.
pub fn validate(config: &BotConfig) -> Result<()> {
    let manager = discover(config);
    let catalog = PluginCatalog::with_builtins();
    let kinds: Vec<&str> = catalog.kinds().collect();

    let mut problems = Vec::new();
    for plugin in manager.discovered() {
        if !kinds.contains(&plugin.manifest.kind.as_str()) {
            problems.push(format!(
                "plugin `{}` has unknown kind `{}` (known: {})",
                plugin.manifest.name,
                plugin.manifest.kind,
                kinds.join(", ")
            ));
        }
    }
    if let Some(names) = &config.plugins.names {
        for name in names {
            if manager.find(name).is_none() {
                problems.push(format!("plugin `{name}` is not installed"));
            }
        }
    }

    if problems.is_empty() {
        println!(
            "VALID: prefix `{}`, {} plugin(s) discovered",
            config.prefix,
            manager.discovered().len()
        );
        return Ok(());
    }
    for problem in &problems {
        println!("  - {problem}");
    }
    bail!("{} configuration problem(s)", problems.len())
}
