//! Privileged platform operations reserved for bot commands.

use async_trait::async_trait;
use url::Url;

use nyx_commands::PlatformError;
use nyx_types::{ChannelId, GuildId, VoiceChannel};

/// Operations only the bot surface may perform. Plugins never see this.
#[async_trait]
pub trait BotControl: Send + Sync {
    /// Voice channels of `guild`.
    async fn voice_channels(&self, guild: &GuildId) -> Vec<VoiceChannel>;

    async fn join_voice_channel(&self, channel: &ChannelId) -> Result<(), PlatformError>;

    async fn leave_voice_channel(&self) -> Result<(), PlatformError>;

    /// Change the bot's nickname within `guild`.
    async fn set_nickname(&self, guild: &GuildId, name: &str) -> Result<(), PlatformError>;

    /// Replace the bot's avatar with the image at `image`.
    async fn set_avatar(&self, image: &Url) -> Result<(), PlatformError>;

    /// Ask the front end to stop after the current dispatch.
    async fn request_shutdown(&self);
}
