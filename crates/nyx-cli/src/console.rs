//! Terminal stand-ins for the chat platform and the bot's own account.
//!
//! The console is a single guild with one text channel. Outbound messages
//! are printed to stdout; voice joins drive a [`MemoryVoiceQueue`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use url::Url;

use nyx_bot::{BotControl, MemoryVoiceQueue};
use nyx_commands::{Platform, PlatformError};
use nyx_types::{ChannelId, GuildId, Member, PlatformPermission, Role, RoleId, User, VoiceChannel};

pub const CONSOLE_GUILD: &str = "console";
pub const CONSOLE_CHANNEL: &str = "console";

/// Who the person at the terminal is.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub name: String,
    pub admin: bool,
    pub roles: Vec<String>,
    pub in_voice: Option<String>,
}

fn role_id(name: &str) -> RoleId {
    RoleId::new(format!("role-{}", name.to_lowercase()))
}

fn voice_id(name: &str) -> ChannelId {
    ChannelId::new(format!("voice-{name}"))
}

pub fn voice_channels(names: &[String]) -> Vec<VoiceChannel> {
    names.iter().map(|n| VoiceChannel::new(voice_id(n), n.as_str())).collect()
}

impl Identity {
    pub fn member(&self) -> Member {
        let mut member = Member::new(User::new(self.user_id.as_str(), self.name.as_str()))
            .with_roles(self.roles.iter().map(|r| role_id(r)));
        if self.admin {
            member = member.with_permissions([PlatformPermission::Administrator]);
        }
        if let Some(channel) = &self.in_voice {
            member = member.in_voice_channel(voice_id(channel));
        }
        member
    }

    pub fn roles(&self) -> Vec<Role> {
        self.roles.iter().map(|r| Role::new(role_id(r), r.as_str())).collect()
    }
}

/// Prints messages and answers roster lookups from a fixed roster.
pub struct ConsolePlatform {
    roles: Vec<Role>,
    members: Vec<Member>,
}

impl ConsolePlatform {
    pub fn new(roles: Vec<Role>, members: Vec<Member>) -> Self {
        Self { roles, members }
    }
}

#[async_trait]
impl Platform for ConsolePlatform {
    async fn send_message(&self, _channel: &ChannelId, text: &str) -> Result<(), PlatformError> {
        println!("{text}");
        Ok(())
    }

    async fn find_role(&self, _guild: &GuildId, query: &str) -> Option<Role> {
        self.roles
            .iter()
            .find(|r| r.id.as_str() == query || r.name.eq_ignore_ascii_case(query))
            .cloned()
    }

    async fn find_member(&self, _guild: &GuildId, query: &str) -> Option<Member> {
        self.members
            .iter()
            .find(|m| {
                m.user.id.as_str() == query
                    || m.user.name.eq_ignore_ascii_case(query)
                    || m.nickname.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(query))
            })
            .cloned()
    }
}

/// The bot's own account: voice connection, profile and process lifetime.
pub struct ConsoleControl {
    channels: Vec<VoiceChannel>,
    voice: Arc<MemoryVoiceQueue>,
    shutdown: Arc<Notify>,
}

impl ConsoleControl {
    pub fn new(channels: Vec<VoiceChannel>, voice: Arc<MemoryVoiceQueue>, shutdown: Arc<Notify>) -> Self {
        Self {
            channels,
            voice,
            shutdown,
        }
    }
}

#[async_trait]
impl BotControl for ConsoleControl {
    async fn voice_channels(&self, _guild: &GuildId) -> Vec<VoiceChannel> {
        self.channels.clone()
    }

    async fn join_voice_channel(&self, channel: &ChannelId) -> Result<(), PlatformError> {
        let Some(target) = self.channels.iter().find(|c| &c.id == channel) else {
            return Err(PlatformError::Api(format!("unknown voice channel {channel}")));
        };
        self.voice.connect(target.id.clone()).await;
        eprintln!("(joined voice channel {})", target.name);
        Ok(())
    }

    async fn leave_voice_channel(&self) -> Result<(), PlatformError> {
        self.voice.disconnect().await;
        eprintln!("(left voice channel)");
        Ok(())
    }

    async fn set_nickname(&self, _guild: &GuildId, name: &str) -> Result<(), PlatformError> {
        eprintln!("(nickname is now {name})");
        Ok(())
    }

    async fn set_avatar(&self, url: &Url) -> Result<(), PlatformError> {
        eprintln!("(avatar is now {url})");
        Ok(())
    }

    async fn request_shutdown(&self) {
        self.shutdown.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyx_bot::{VoiceEventBus, VoiceQueue};

    fn identity() -> Identity {
        Identity {
            user_id: "u1".into(),
            name: "Alice".into(),
            admin: false,
            roles: vec!["DJ".into()],
            in_voice: Some("General".into()),
        }
    }

    #[test]
    fn identity_member_carries_roles_and_voice() {
        let member = identity().member();
        assert_eq!(member.roles, vec![RoleId::new("role-dj")]);
        assert_eq!(member.voice_channel, Some(ChannelId::new("voice-General")));
        assert!(!member.is_admin());
    }

    #[tokio::test]
    async fn roster_lookup_by_name_ignores_case() {
        let id = identity();
        let platform = ConsolePlatform::new(id.roles(), vec![id.member()]);
        let guild = GuildId::new(CONSOLE_GUILD);
        assert_eq!(platform.find_role(&guild, "dj").await.unwrap().name, "DJ");
        assert_eq!(platform.find_member(&guild, "alice").await.unwrap().user.id.as_str(), "u1");
        assert!(platform.find_role(&guild, "mods").await.is_none());
    }

    #[tokio::test]
    async fn joining_connects_the_voice_queue() {
        let voice = Arc::new(MemoryVoiceQueue::new(Arc::new(VoiceEventBus::new())));
        let control = ConsoleControl::new(
            voice_channels(&["General".into()]),
            voice.clone(),
            Arc::new(Notify::new()),
        );

        control.join_voice_channel(&ChannelId::new("voice-General")).await.unwrap();
        assert!(voice.is_in_voice_channel());
        assert!(control.join_voice_channel(&ChannelId::new("voice-Lobby")).await.is_err());

        control.leave_voice_channel().await.unwrap();
        assert!(!voice.is_in_voice_channel());

        let shutdown = Arc::new(Notify::new());
        let control = ConsoleControl::new(Vec::new(), voice, shutdown.clone());
        control.request_shutdown().await;
        tokio::time::timeout(std::time::Duration::from_secs(1), shutdown.notified())
            .await
            .unwrap();
    }
}
