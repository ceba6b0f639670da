//! Fakes shared by this crate's unit tests.

use std::sync::{Arc, Mutex};

use anyhow::bail;
use async_trait::async_trait;
use url::Url;

use nyx_commands::{AllowlistStore, MemoryAllowlist, Platform, PlatformError};
use nyx_types::{ChannelId, GuildId, Member, Role, RoleId, UserId, VoiceChannel};

use crate::control::BotControl;
use crate::manifest::PluginEnv;
use crate::voice::{MemoryVoiceQueue, VoiceEventBus};

/// Records every outbound message.
#[derive(Default)]
pub struct Outbox {
    pub sent: Mutex<Vec<(ChannelId, String)>>,
}

impl Outbox {
    pub fn texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl Platform for Outbox {
    async fn send_message(&self, channel: &ChannelId, text: &str) -> Result<(), PlatformError> {
        self.sent
            .lock()
            .unwrap()
            .push((channel.clone(), text.to_string()));
        Ok(())
    }

    async fn find_role(&self, _: &GuildId, _: &str) -> Option<Role> {
        None
    }

    async fn find_member(&self, _: &GuildId, _: &str) -> Option<Member> {
        None
    }
}

/// Control surface that accepts everything and remembers what it did.
#[derive(Default)]
pub struct Controls {
    pub channels: Vec<VoiceChannel>,
    pub joined: Mutex<Option<ChannelId>>,
    pub shutdown: Mutex<bool>,
    /// Makes account changes fail with an API error instead of a permission error.
    pub api_down: Mutex<bool>,
}

#[async_trait]
impl BotControl for Controls {
    async fn voice_channels(&self, _: &GuildId) -> Vec<VoiceChannel> {
        self.channels.clone()
    }

    async fn join_voice_channel(&self, channel: &ChannelId) -> Result<(), PlatformError> {
        *self.joined.lock().unwrap() = Some(channel.clone());
        Ok(())
    }

    async fn leave_voice_channel(&self) -> Result<(), PlatformError> {
        *self.joined.lock().unwrap() = None;
        Ok(())
    }

    async fn set_nickname(&self, _: &GuildId, _: &str) -> Result<(), PlatformError> {
        if *self.api_down.lock().unwrap() {
            return Err(PlatformError::Api("gateway timeout".into()));
        }
        Err(PlatformError::MissingPermission("change nickname".into()))
    }

    async fn set_avatar(&self, _: &Url) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn request_shutdown(&self) {
        *self.shutdown.lock().unwrap() = true;
    }
}

pub fn null_env() -> PluginEnv {
    let voice_events = Arc::new(VoiceEventBus::new());
    PluginEnv {
        platform: Arc::new(Outbox::default()),
        voice: Arc::new(MemoryVoiceQueue::new(voice_events.clone())),
        voice_events,
    }
}

/// Allowlist whose disabled-plugin writes always fail.
pub struct ReadOnlyStore(pub Arc<MemoryAllowlist>);

#[async_trait]
impl AllowlistStore for ReadOnlyStore {
    async fn registered_roles(&self, guild: &GuildId) -> anyhow::Result<Vec<RoleId>> {
        self.0.registered_roles(guild).await
    }

    async fn registered_users(&self, guild: &GuildId) -> anyhow::Result<Vec<UserId>> {
        self.0.registered_users(guild).await
    }

    async fn register_role(&self, guild: &GuildId, role: &RoleId) -> anyhow::Result<bool> {
        self.0.register_role(guild, role).await
    }

    async fn unregister_role(&self, guild: &GuildId, role: &RoleId) -> anyhow::Result<bool> {
        self.0.unregister_role(guild, role).await
    }

    async fn register_user(&self, guild: &GuildId, user: &UserId) -> anyhow::Result<bool> {
        self.0.register_user(guild, user).await
    }

    async fn unregister_user(&self, guild: &GuildId, user: &UserId) -> anyhow::Result<bool> {
        self.0.unregister_user(guild, user).await
    }

    async fn disabled_plugins(&self) -> anyhow::Result<Vec<String>> {
        self.0.disabled_plugins().await
    }

    async fn add_disabled_plugin(&self, _: &str) -> anyhow::Result<bool> {
        bail!("disk full")
    }

    async fn remove_disabled_plugin(&self, _: &str) -> anyhow::Result<bool> {
        bail!("disk full")
    }
}

/// A started bot with the built-in plugins over recording fakes.
pub struct Harness {
    pub dispatcher: nyx_commands::Dispatcher,
    pub outbox: Arc<Outbox>,
    pub controls: Arc<Controls>,
    pub store: Arc<MemoryAllowlist>,
    pub voice: Arc<MemoryVoiceQueue>,
}

pub async fn harness(channels: Vec<VoiceChannel>) -> Harness {
    let store = Arc::new(MemoryAllowlist::new());
    harness_over(channels, store.clone(), store).await
}

/// Like [`harness`], but the bot talks to `backend` while tests inspect
/// `store`.
pub async fn harness_over(
    channels: Vec<VoiceChannel>,
    store: Arc<MemoryAllowlist>,
    backend: Arc<dyn AllowlistStore>,
) -> Harness {
    use crate::plugins::{MusicPlugin, TestPlugin};
    use crate::startup::{Bot, BotServices};
    use nyx_commands::Plugin;

    let outbox = Arc::new(Outbox::default());
    let controls = Arc::new(Controls {
        channels,
        ..Controls::default()
    });
    let voice_events = Arc::new(VoiceEventBus::new());
    let voice = Arc::new(MemoryVoiceQueue::new(voice_events.clone()));
    let services = BotServices {
        platform: outbox.clone(),
        control: controls.clone(),
        store: backend,
        voice: voice.clone(),
        voice_events,
    };
    let env = services.plugin_env();
    let plugins: Vec<Arc<dyn Plugin>> = vec![
        Arc::new(MusicPlugin::new(&env)),
        Arc::new(TestPlugin::new(&env)),
    ];
    let dispatcher = Bot::assemble(&nyx_types::BotConfig::default(), services, plugins)
        .await
        .unwrap();

    Harness {
        dispatcher,
        outbox,
        controls,
        store,
        voice,
    }
}
