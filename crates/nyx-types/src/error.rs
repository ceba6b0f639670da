//! Error types shared across all nyx crates.
//!
//! [`CommandError`] is the result envelope of one dispatch. It is a returned
//! value, never propagated with `?`: each variant carries exactly the context
//! its message template needs, and [`CommandError::context`] exposes that
//! context as a structured key/value payload for external renderers.
//!
//! [`NyxError`] covers startup and configuration failures.

use serde::Serialize;

use crate::permission::PermissionFlags;

/// Outcome of dispatching one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandError {
    #[error("success")]
    Success,

    #[error("not a command")]
    NotACommand,

    #[error("Incorrect usage of `{command}`. Use `usage {command}` to see how it is used.")]
    IncorrectBotCommandUsage { command: String },

    #[error("Incorrect usage of `{tag} {command}`. Use `usage {tag} {command}` to see how it is used.")]
    IncorrectPluginCommandUsage { tag: String, command: String },

    #[error("`{command}` is not a bot command. Use `help bot` to list bot commands.")]
    UnrecognizedBotCommand { command: String },

    #[error("`{command}` is not a command of plugin `{tag}`. Use `help {tag}` to list its commands.")]
    UnrecognizedPluginCommand { tag: String, command: String },

    #[error("No plugin has the tag or alias `{tag}`. Use `help plugins` to list plugin tags.")]
    UnrecognizedPluginTag { tag: String },

    #[error("You do not have permission to use `{command}` (requires {permission}).")]
    InsufficientUserPermissions {
        command: String,
        permission: PermissionFlags,
    },

    #[error("The bot does not have the platform permissions needed to run `{command}`.")]
    InsufficientBotPermissions { command: String },

    #[error("`{command}` can only be used inside a server.")]
    GuildOnlyCommand { command: String },

    #[error("Plugin `{tag}` is currently disabled.")]
    PluginDisabled { tag: String },

    #[error("`{alias} {command}` is ambiguous between plugins {}. Use the plugin's full tag instead.", .tags.join(", "))]
    PluginCommandCollision {
        alias: String,
        command: String,
        tags: Vec<String>,
    },

    #[error("More than one plugin uses the tag `{tag}`; its commands cannot be dispatched.")]
    PluginTagCollision { tag: String },

    #[error("`{value}` is not a valid {type_name} for argument `{arg}`.")]
    InvalidArgumentType {
        #[serde(rename = "type")]
        type_name: String,
        arg: String,
        value: String,
    },

    #[error("{message}")]
    Custom { message: String },
}

impl CommandError {
    pub fn success() -> Self {
        Self::Success
    }

    /// A failure carrying a pre-rendered message.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// The fieldless code of this outcome.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Success => ErrorCode::Success,
            Self::NotACommand => ErrorCode::NotACommand,
            Self::IncorrectBotCommandUsage { .. } => ErrorCode::IncorrectBotCommandUsage,
            Self::IncorrectPluginCommandUsage { .. } => ErrorCode::IncorrectPluginCommandUsage,
            Self::UnrecognizedBotCommand { .. } => ErrorCode::UnrecognizedBotCommand,
            Self::UnrecognizedPluginCommand { .. } => ErrorCode::UnrecognizedPluginCommand,
            Self::UnrecognizedPluginTag { .. } => ErrorCode::UnrecognizedPluginTag,
            Self::InsufficientUserPermissions { .. } => ErrorCode::InsufficientUserPermissions,
            Self::InsufficientBotPermissions { .. } => ErrorCode::InsufficientBotPermissions,
            Self::GuildOnlyCommand { .. } => ErrorCode::GuildOnlyCommand,
            Self::PluginDisabled { .. } => ErrorCode::PluginDisabled,
            Self::PluginCommandCollision { .. } => ErrorCode::PluginCommandCollision,
            Self::PluginTagCollision { .. } => ErrorCode::PluginTagCollision,
            Self::InvalidArgumentType { .. } => ErrorCode::InvalidArgumentType,
            Self::Custom { .. } => ErrorCode::Custom,
        }
    }

    /// Structured context for rendering, keyed as listed by
    /// [`ErrorCode::context_keys`]. `None` for codes without context.
    pub fn context(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        let serde_json::Value::Object(mut map) = serde_json::to_value(self).ok()? else {
            return None;
        };
        map.remove("code");
        if map.is_empty() {
            None
        } else {
            Some(map)
        }
    }
}

/// Fieldless outcome codes, used by renderers to pick a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Success,
    NotACommand,
    IncorrectBotCommandUsage,
    IncorrectPluginCommandUsage,
    UnrecognizedBotCommand,
    UnrecognizedPluginCommand,
    UnrecognizedPluginTag,
    InsufficientUserPermissions,
    InsufficientBotPermissions,
    GuildOnlyCommand,
    PluginDisabled,
    PluginCommandCollision,
    PluginTagCollision,
    InvalidArgumentType,
    Custom,
}

impl ErrorCode {
    /// Context keys every error with this code carries.
    pub fn context_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Success | Self::NotACommand => &[],
            Self::IncorrectBotCommandUsage
            | Self::UnrecognizedBotCommand
            | Self::InsufficientBotPermissions
            | Self::GuildOnlyCommand => &["command"],
            Self::IncorrectPluginCommandUsage | Self::UnrecognizedPluginCommand => {
                &["tag", "command"]
            }
            Self::UnrecognizedPluginTag | Self::PluginDisabled | Self::PluginTagCollision => {
                &["tag"]
            }
            Self::InsufficientUserPermissions => &["command", "permission"],
            Self::PluginCommandCollision => &["alias", "command", "tags"],
            Self::InvalidArgumentType => &["type", "arg", "value"],
            Self::Custom => &["message"],
        }
    }
}

/// Errors raised while starting the bot or loading its configuration.
#[derive(Debug, thiserror::Error)]
pub enum NyxError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
