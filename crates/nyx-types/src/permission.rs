//! Permission categories a command can require, and the platform's own
//! fine-grained permission identifiers.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Permission categories required to invoke a command.
    ///
    /// Any set bit is sufficient on its own: a caller is eligible if at least
    /// one requirement holds. An empty set means the command is unrestricted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PermissionFlags: u8 {
        /// Caller holds the platform administrator capability.
        const ADMIN = 1 << 0;
        /// Caller holds a role registered in the guild's role allowlist.
        const ROLE = 1 << 1;
        /// Caller is registered in the guild's user allowlist.
        const USER = 1 << 2;
        /// Caller holds every listed [`PlatformPermission`].
        const PERMISSION = 1 << 3;
    }
}

impl fmt::Display for PermissionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        f.write_str(&names.join(" | "))
    }
}

/// Fine-grained permissions as defined by the messaging platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformPermission {
    Administrator,
    ManageGuild,
    ManageRoles,
    ManageChannels,
    ManageMessages,
    ManageNicknames,
    ChangeNickname,
    KickMembers,
    BanMembers,
    SendMessages,
    Connect,
    Speak,
    MoveMembers,
}

impl PlatformPermission {
    /// The snake_case identifier used in config files and error context.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::ManageGuild => "manage_guild",
            Self::ManageRoles => "manage_roles",
            Self::ManageChannels => "manage_channels",
            Self::ManageMessages => "manage_messages",
            Self::ManageNicknames => "manage_nicknames",
            Self::ChangeNickname => "change_nickname",
            Self::KickMembers => "kick_members",
            Self::BanMembers => "ban_members",
            Self::SendMessages => "send_messages",
            Self::Connect => "connect",
            Self::Speak => "speak",
            Self::MoveMembers => "move_members",
        }
    }
}

impl fmt::Display for PlatformPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
