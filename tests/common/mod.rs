//! Shared helpers for integration tests.
//!
//! Each integration test file compiles common/ as its own module, so not
//! every helper is used in every file.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;

use nyx_bot::{Bot, BotControl, BotServices, MemoryVoiceQueue, PluginEnv, VoiceEventBus};
use nyx_commands::{
    ArgConverter, ArgValue, CommandSet, CommandSpec, Dispatcher, HandlerCall, HandlerId,
    MemoryAllowlist, Platform, PlatformError, Plugin, RegistrationError, RegistryBuilder,
    RoleConverter,
};
use nyx_types::{
    BotConfig, ChannelId, CommandContext, CommandError, GuildId, Member, PermissionFlags,
    PlatformPermission, Role, User, VoiceChannel,
};

pub const GUILD: &str = "g1";
pub const TEXT_CHANNEL: &str = "c1";

// ---------------------------------------------------------------------------
// Callers
// ---------------------------------------------------------------------------

pub fn member(id: &str) -> Member {
    Member::new(User::new(id, id))
}

pub fn admin(id: &str) -> Member {
    member(id).with_permissions([PlatformPermission::Administrator])
}

/// A guild message from `member`.
pub fn said(member: &Member, text: &str) -> CommandContext {
    CommandContext::guild(GUILD, TEXT_CHANNEL, member.clone(), text)
}

// ---------------------------------------------------------------------------
// Platform fakes
// ---------------------------------------------------------------------------

/// Records outbound messages and answers lookups from a fixed roster.
#[derive(Default)]
pub struct RecordingPlatform {
    pub sent: Mutex<Vec<(ChannelId, String)>>,
    pub roles: Vec<Role>,
    pub members: Vec<Member>,
}

impl RecordingPlatform {
    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Platform for RecordingPlatform {
    async fn send_message(&self, channel: &ChannelId, text: &str) -> Result<(), PlatformError> {
        self.sent
            .lock()
            .unwrap()
            .push((channel.clone(), text.to_string()));
        Ok(())
    }

    async fn find_role(&self, _: &GuildId, query: &str) -> Option<Role> {
        self.roles
            .iter()
            .find(|r| r.id.as_str() == query || r.name.eq_ignore_ascii_case(query))
            .cloned()
    }

    async fn find_member(&self, _: &GuildId, query: &str) -> Option<Member> {
        self.members
            .iter()
            .find(|m| m.user.id.as_str() == query || m.user.name.eq_ignore_ascii_case(query))
            .cloned()
    }
}

/// Bot account fake wired to a memory voice queue.
pub struct RecordingControls {
    pub channels: Vec<VoiceChannel>,
    pub voice: Arc<MemoryVoiceQueue>,
    pub shutdown: Mutex<bool>,
}

#[async_trait]
impl BotControl for RecordingControls {
    async fn voice_channels(&self, _: &GuildId) -> Vec<VoiceChannel> {
        self.channels.clone()
    }

    async fn join_voice_channel(&self, channel: &ChannelId) -> Result<(), PlatformError> {
        self.voice.connect(channel.clone()).await;
        Ok(())
    }

    async fn leave_voice_channel(&self) -> Result<(), PlatformError> {
        self.voice.disconnect().await;
        Ok(())
    }

    async fn set_nickname(&self, _: &GuildId, _: &str) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn set_avatar(&self, _: &url::Url) -> Result<(), PlatformError> {
        Err(PlatformError::MissingPermission("change avatar".into()))
    }

    async fn request_shutdown(&self) {
        *self.shutdown.lock().unwrap() = true;
    }
}

/// Every collaborator the bot needs, kept around for assertions.
pub struct World {
    pub platform: Arc<RecordingPlatform>,
    pub controls: Arc<RecordingControls>,
    pub store: Arc<MemoryAllowlist>,
    pub voice: Arc<MemoryVoiceQueue>,
    pub voice_events: Arc<VoiceEventBus>,
}

impl World {
    pub fn new() -> Self {
        Self::with_roster(Vec::new(), Vec::new())
    }

    pub fn with_roster(roles: Vec<Role>, members: Vec<Member>) -> Self {
        let voice_events = Arc::new(VoiceEventBus::new());
        let voice = Arc::new(MemoryVoiceQueue::new(voice_events.clone()));
        Self {
            platform: Arc::new(RecordingPlatform {
                roles,
                members,
                ..RecordingPlatform::default()
            }),
            controls: Arc::new(RecordingControls {
                channels: vec![VoiceChannel::new("v1", "General")],
                voice: voice.clone(),
                shutdown: Mutex::new(false),
            }),
            store: Arc::new(MemoryAllowlist::new()),
            voice,
            voice_events,
        }
    }

    pub fn services(&self) -> BotServices {
        BotServices {
            platform: self.platform.clone(),
            control: self.controls.clone(),
            store: self.store.clone(),
            voice: self.voice.clone(),
            voice_events: self.voice_events.clone(),
        }
    }

    pub fn env(&self) -> PluginEnv {
        self.services().plugin_env()
    }

    /// Start a bot with default configuration over `plugins`.
    pub async fn assemble(&self, plugins: Vec<Arc<dyn Plugin>>) -> Dispatcher {
        Bot::assemble(&BotConfig::default(), self.services(), plugins)
            .await
            .expect("bot should start")
    }
}

// ---------------------------------------------------------------------------
// Spy plugin
// ---------------------------------------------------------------------------

/// Accepts any token after a short delay.
pub struct SlowConverter;

#[async_trait]
impl ArgConverter for SlowConverter {
    fn type_name(&self) -> &str {
        "Slow"
    }

    async fn convert(&self, raw: &str, _: &CommandContext, _: &dyn Platform) -> Option<ArgValue> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Some(ArgValue::Text(raw.to_uppercase()))
    }
}

const SPY_HANDLERS: &[HandlerId] = &[
    "ping",
    "pair_one",
    "pair_two",
    "grant",
    "slow",
    "roleonly",
    "useronly",
    "kick",
    "guildping",
];

/// Plugin whose handlers only record that they ran and with what.
pub struct SpyPlugin {
    tag: String,
    alias: Option<String>,
    calls: Mutex<Vec<(HandlerId, Vec<ArgValue>)>>,
}

impl SpyPlugin {
    pub fn new(tag: &str, alias: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            tag: tag.to_string(),
            alias: alias.map(str::to_string),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(HandlerId, Vec<ArgValue>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn handlers(&self) -> Vec<HandlerId> {
        self.calls().into_iter().map(|(h, _)| h).collect()
    }
}

#[async_trait]
impl CommandSet for SpyPlugin {
    fn declare(&self, r: &mut RegistryBuilder) -> Result<(), RegistrationError> {
        r.register(CommandSpec::new("ping", "Record a ping"))?;
        r.register(CommandSpec::new("pair_one", "One argument").name("pair").param("a"))?;
        r.register(
            CommandSpec::new("pair_two", "Two arguments")
                .name("pair")
                .param("a")
                .param("b"),
        )?;
        r.register(CommandSpec::new("grant", "Takes a role").converted("role", RoleConverter))?;
        r.register(CommandSpec::new("slow", "Slow conversion").converted("value", SlowConverter))?;
        r.register(CommandSpec::new("roleonly", "Registered roles only"))?;
        r.register(CommandSpec::new("useronly", "Registered users only"))?;
        r.register(CommandSpec::new("kick", "Needs the kick permission"))?;
        r.register(CommandSpec::new("guildping", "Guild only ping"))?;
        r.register(CommandSpec::new("boom", "Fails inside the handler"))?;

        for handler in ["ping", "pair_one", "pair_two", "grant", "slow"] {
            r.attach_usage(handler, "Test command.")?;
        }
        r.attach_permission("roleonly", PermissionFlags::ROLE, &[])?;
        r.attach_permission("useronly", PermissionFlags::USER, &[])?;
        r.attach_permission("kick", PermissionFlags::empty(), &[PlatformPermission::KickMembers])?;
        r.attach_guild_only("guildping")?;
        Ok(())
    }

    async fn invoke(&self, call: HandlerCall<'_>) -> anyhow::Result<CommandError> {
        if call.handler == "boom" {
            bail!("backend unavailable");
        }
        if !SPY_HANDLERS.contains(&call.handler) {
            bail!("spy has no handler `{}`", call.handler);
        }
        self.calls
            .lock()
            .unwrap()
            .push((call.handler, call.args.values().to_vec()));
        Ok(CommandError::success())
    }
}

impl Plugin for SpyPlugin {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn tag_alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}
