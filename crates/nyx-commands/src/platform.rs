//! Collaborator interfaces the command engine consumes.
//!
//! The messaging platform connection and the persisted allowlist live outside
//! this crate. Handlers and converters reach them only through these traits.

use async_trait::async_trait;
use thiserror::Error;

use nyx_types::{ChannelId, GuildId, Member, Role, RoleId, UserId};

/// Errors reported by the platform connector.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("platform API error: {0}")]
    Api(String),

    #[error("bot lacks platform permission: {0}")]
    MissingPermission(String),

    #[error("operation not supported: {0}")]
    NotSupported(String),

    #[error("{0}")]
    Other(String),
}

/// Outbound messaging and roster lookups provided by the platform connector.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Send a text message to a channel.
    async fn send_message(&self, channel: &ChannelId, text: &str) -> Result<(), PlatformError>;

    /// Resolve a role within a guild by name or id.
    async fn find_role(&self, guild: &GuildId, query: &str) -> Option<Role>;

    /// Resolve a guild member by name, nickname or id.
    async fn find_member(&self, guild: &GuildId, query: &str) -> Option<Member>;
}

/// Persisted permission allowlists and the disabled-plugin list.
///
/// Reads may perform I/O, so every method is async. Mutators return whether
/// the stored set changed.
#[async_trait]
pub trait AllowlistStore: Send + Sync {
    async fn registered_roles(&self, guild: &GuildId) -> anyhow::Result<Vec<RoleId>>;

    async fn registered_users(&self, guild: &GuildId) -> anyhow::Result<Vec<UserId>>;

    async fn register_role(&self, guild: &GuildId, role: &RoleId) -> anyhow::Result<bool>;

    async fn unregister_role(&self, guild: &GuildId, role: &RoleId) -> anyhow::Result<bool>;

    async fn register_user(&self, guild: &GuildId, user: &UserId) -> anyhow::Result<bool>;

    async fn unregister_user(&self, guild: &GuildId, user: &UserId) -> anyhow::Result<bool>;

    async fn disabled_plugins(&self) -> anyhow::Result<Vec<String>>;

    async fn add_disabled_plugin(&self, name: &str) -> anyhow::Result<bool>;

    async fn remove_disabled_plugin(&self, name: &str) -> anyhow::Result<bool>;
}
