//! Startup wiring: plugins, surfaces and the dispatcher.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use nyx_commands::{
    AllowlistStore, Dispatcher, PermissionGate, Platform, Plugin, PluginHost, PluginState, Surface,
};
use nyx_types::BotConfig;

use crate::bot::BotCommands;
use crate::control::BotControl;
use crate::manifest::{PluginCatalog, PluginEnv, PluginManager};
use crate::voice::{VoiceEventBus, VoiceQueue};

/// External collaborators the bot runs against.
#[derive(Clone)]
pub struct BotServices {
    pub platform: Arc<dyn Platform>,
    pub control: Arc<dyn BotControl>,
    pub store: Arc<dyn AllowlistStore>,
    pub voice: Arc<dyn VoiceQueue>,
    pub voice_events: Arc<VoiceEventBus>,
}

impl BotServices {
    pub fn plugin_env(&self) -> PluginEnv {
        PluginEnv {
            platform: self.platform.clone(),
            voice: self.voice.clone(),
            voice_events: self.voice_events.clone(),
        }
    }
}

/// Entry points that assemble a ready [`Dispatcher`].
pub struct Bot;

impl Bot {
    /// Discover and load plugins from `config.plugin_dirs`, then assemble.
    pub async fn start(
        config: &BotConfig,
        services: BotServices,
        catalog: &PluginCatalog,
    ) -> Result<Dispatcher> {
        config.validate().context("invalid configuration")?;

        let mut manager = PluginManager::new();
        manager.scan_subdirs(&config.plugin_dirs);
        let plugins = manager
            .load(&config.plugins, catalog, &services.plugin_env())
            .into_iter()
            .map(|loaded| loaded.plugin)
            .collect();

        Self::assemble(config, services, plugins).await
    }

    /// Build surfaces for already instantiated plugins.
    ///
    /// Plugins in the persisted disabled list start DISABLED_PERMANENT. Any
    /// registration or initialization failure aborts startup.
    pub async fn assemble(
        config: &BotConfig,
        services: BotServices,
        plugins: Vec<Arc<dyn Plugin>>,
    ) -> Result<Dispatcher> {
        let surfaces = plugins
            .into_iter()
            .map(|plugin| {
                let tag = plugin.tag().to_string();
                Surface::plugin(plugin).with_context(|| format!("register plugin `{tag}`"))
            })
            .collect::<Result<Vec<_>>>()?;
        let host = Arc::new(PluginHost::new(surfaces));

        let disabled = services
            .store
            .disabled_plugins()
            .await
            .context("read disabled plugins")?;
        for name in disabled {
            if host.set_state(&name, PluginState::DisabledPermanent).is_none() {
                warn!(plugin = %name, "disabled plugin is not loaded");
            }
        }

        host.initialize_all().await?;

        let commands = BotCommands::new(
            config.prefix,
            services.platform.clone(),
            services.control.clone(),
            host.clone(),
            services.store.clone(),
        );
        commands
            .watch_voice(&services.voice_events)
            .context("watch voice events")?;
        let bot = Surface::bot(Arc::new(commands)).context("register bot commands")?;

        info!(
            prefix = %config.prefix,
            plugins = host.plugins().len(),
            collisions = !host.collisions().is_empty(),
            "bot started"
        );
        Ok(Dispatcher::new(
            config.prefix,
            bot,
            host,
            PermissionGate::new(services.store),
            services.platform,
        ))
    }
}
