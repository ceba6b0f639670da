//! Core types shared across all nyx crates.
//!
//! Defines identifiers, the caller context every handler receives, permission
//! flags, the [`CommandError`] result envelope, and configuration types used by
//! the command engine, the bot surface and the CLI.

pub mod config;
pub mod context;
pub mod error;
pub mod ids;
pub mod permission;

pub use config::{AllowlistSeed, BotConfig, PluginLoadConfig, CONFIG_FILENAME, DEFAULT_PREFIX};
pub use context::{CommandContext, Member, Role, User, VoiceChannel};
pub use error::{CommandError, ErrorCode, NyxError};
pub use ids::{ChannelId, GuildId, RoleId, UserId};
pub use permission::{PermissionFlags, PlatformPermission};
