//! Caller context handed to every command handler.
//!
//! A [`CommandContext`] describes who sent a message and from where. It is the
//! explicit first argument of every handler and the scope in which argument
//! converters resolve roles and members.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, GuildId, RoleId, UserId};
use crate::permission::PlatformPermission;

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

impl User {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A user's membership in a guild: roles, resolved permissions and current
/// voice channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user: User,
    /// Guild nickname, if one is set.
    pub nickname: Option<String>,
    pub roles: Vec<RoleId>,
    pub permissions: BTreeSet<PlatformPermission>,
    /// Voice channel the member is currently connected to.
    pub voice_channel: Option<ChannelId>,
}

impl Member {
    /// A member with no roles, permissions or voice connection.
    pub fn new(user: User) -> Self {
        Self {
            user,
            nickname: None,
            roles: Vec::new(),
            permissions: BTreeSet::new(),
            voice_channel: None,
        }
    }

    #[must_use]
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = RoleId>) -> Self {
        self.roles.extend(roles);
        self
    }

    #[must_use]
    pub fn with_permissions(
        mut self,
        permissions: impl IntoIterator<Item = PlatformPermission>,
    ) -> Self {
        self.permissions.extend(permissions);
        self
    }

    #[must_use]
    pub fn in_voice_channel(mut self, channel: impl Into<ChannelId>) -> Self {
        self.voice_channel = Some(channel.into());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.permissions.contains(&PlatformPermission::Administrator)
    }

    pub fn has_permission(&self, permission: PlatformPermission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Name shown in the guild: the nickname if set, otherwise the user name.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.user.name)
    }
}

/// A guild role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

impl Role {
    pub fn new(id: impl Into<RoleId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A voice channel within a guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceChannel {
    pub id: ChannelId,
    pub name: String,
}

impl VoiceChannel {
    pub fn new(id: impl Into<ChannelId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Identity and origin of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    /// Guild the message was sent in; `None` for direct messages.
    pub guild: Option<GuildId>,
    /// Channel the message was sent in. Replies go here.
    pub channel: ChannelId,
    pub author: User,
    /// Guild membership of the author; `None` outside a guild.
    pub member: Option<Member>,
    /// Full message text as received.
    pub raw_content: String,
}

impl CommandContext {
    /// Context for a message sent inside a guild by `member`.
    pub fn guild(
        guild: impl Into<GuildId>,
        channel: impl Into<ChannelId>,
        member: Member,
        content: impl Into<String>,
    ) -> Self {
        Self {
            guild: Some(guild.into()),
            channel: channel.into(),
            author: member.user.clone(),
            member: Some(member),
            raw_content: content.into(),
        }
    }

    /// Context for a direct message from `author`.
    pub fn direct(channel: impl Into<ChannelId>, author: User, content: impl Into<String>) -> Self {
        Self {
            guild: None,
            channel: channel.into(),
            author,
            member: None,
            raw_content: content.into(),
        }
    }

    /// Whether the message originated inside a guild with a resolved member.
    pub fn in_guild(&self) -> bool {
        self.guild.is_some() && self.member.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.member.as_ref().is_some_and(Member::is_admin)
    }

    /// Copy of this context carrying a different message body.
    #[must_use]
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            raw_content: content.into(),
            ..self.clone()
        }
    }
}
