//! Permission gate evaluated before a handler body runs.

use std::sync::Arc;

use tracing::{debug, warn};

use nyx_types::{CommandContext, CommandError, PermissionFlags, PlatformPermission};

use crate::descriptor::CommandDescriptor;
use crate::platform::AllowlistStore;

/// Evaluates permission flags against the caller and the allowlist store.
///
/// Any one set flag is sufficient. Administrators pass every check. The
/// gate never writes to the store.
#[derive(Clone)]
pub struct PermissionGate {
    store: Arc<dyn AllowlistStore>,
}

impl PermissionGate {
    pub fn new(store: Arc<dyn AllowlistStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn AllowlistStore> {
        &self.store
    }

    /// Whether the caller satisfies `flags`.
    ///
    /// `platform` lists the platform permissions that must all be held when
    /// [`PermissionFlags::PERMISSION`] is set. Store failures deny.
    pub async fn is_eligible(
        &self,
        ctx: &CommandContext,
        flags: PermissionFlags,
        platform: &[PlatformPermission],
    ) -> bool {
        if flags.is_empty() {
            return true;
        }

        let (Some(guild), Some(member)) = (&ctx.guild, &ctx.member) else {
            return false;
        };

        if member.is_admin() {
            return true;
        }

        if flags.contains(PermissionFlags::ROLE) {
            match self.store.registered_roles(guild).await {
                Ok(roles) if member.roles.iter().any(|r| roles.contains(r)) => return true,
                Ok(_) => {}
                Err(e) => warn!(guild = %guild, error = %e, "failed to read registered roles"),
            }
        }

        if flags.contains(PermissionFlags::USER) {
            match self.store.registered_users(guild).await {
                Ok(users) if users.contains(&member.user.id) => return true,
                Ok(_) => {}
                Err(e) => warn!(guild = %guild, error = %e, "failed to read registered users"),
            }
        }

        flags.contains(PermissionFlags::PERMISSION)
            && !platform.is_empty()
            && platform.iter().all(|p| member.has_permission(*p))
    }

    /// Check the guild-only flag, then the permission flags, for `descriptor`.
    pub async fn authorize(
        &self,
        ctx: &CommandContext,
        descriptor: &CommandDescriptor,
    ) -> Result<(), CommandError> {
        if descriptor.guild_only && !ctx.in_guild() {
            return Err(CommandError::GuildOnlyCommand {
                command: descriptor.command_name.clone(),
            });
        }

        if !self
            .is_eligible(ctx, descriptor.permissions, &descriptor.platform_permissions)
            .await
        {
            debug!(
                command = %descriptor.command_name,
                user = %ctx.author.id,
                required = %descriptor.permissions,
                "permission denied"
            );
            return Err(CommandError::InsufficientUserPermissions {
                command: descriptor.command_name.clone(),
                permission: descriptor.permissions,
            });
        }

        Ok(())
    }
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate").finish_non_exhaustive()
    }
}
