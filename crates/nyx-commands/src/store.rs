//! In-memory [`AllowlistStore`], seeded from configuration.

use std::sync::RwLock;

use async_trait::async_trait;

use nyx_types::{AllowlistSeed, GuildId, RoleId, UserId};

use crate::platform::AllowlistStore;

/// Allowlists held in process memory.
///
/// Suitable for tests and for front ends that persist the seed themselves.
#[derive(Debug, Default)]
pub struct MemoryAllowlist {
    inner: RwLock<AllowlistSeed>,
}

impl MemoryAllowlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: AllowlistSeed) -> Self {
        Self {
            inner: RwLock::new(seed),
        }
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> AllowlistSeed {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, AllowlistSeed> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, AllowlistSeed> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn insert_unique<T: PartialEq + Clone>(list: &mut Vec<T>, item: &T) -> bool {
    if list.contains(item) {
        false
    } else {
        list.push(item.clone());
        true
    }
}

fn remove_item<T: PartialEq>(list: &mut Vec<T>, item: &T) -> bool {
    let before = list.len();
    list.retain(|x| x != item);
    list.len() < before
}

#[async_trait]
impl AllowlistStore for MemoryAllowlist {
    async fn registered_roles(&self, guild: &GuildId) -> anyhow::Result<Vec<RoleId>> {
        Ok(self
            .read()
            .registered_roles
            .get(guild)
            .cloned()
            .unwrap_or_default())
    }

    async fn registered_users(&self, guild: &GuildId) -> anyhow::Result<Vec<UserId>> {
        Ok(self
            .read()
            .registered_users
            .get(guild)
            .cloned()
            .unwrap_or_default())
    }

    async fn register_role(&self, guild: &GuildId, role: &RoleId) -> anyhow::Result<bool> {
        let mut seed = self.write();
        let roles = seed.registered_roles.entry(guild.clone()).or_default();
        Ok(insert_unique(roles, role))
    }

    async fn unregister_role(&self, guild: &GuildId, role: &RoleId) -> anyhow::Result<bool> {
        let mut seed = self.write();
        Ok(seed
            .registered_roles
            .get_mut(guild)
            .is_some_and(|roles| remove_item(roles, role)))
    }

    async fn register_user(&self, guild: &GuildId, user: &UserId) -> anyhow::Result<bool> {
        let mut seed = self.write();
        let users = seed.registered_users.entry(guild.clone()).or_default();
        Ok(insert_unique(users, user))
    }

    async fn unregister_user(&self, guild: &GuildId, user: &UserId) -> anyhow::Result<bool> {
        let mut seed = self.write();
        Ok(seed
            .registered_users
            .get_mut(guild)
            .is_some_and(|users| remove_item(users, user)))
    }

    async fn disabled_plugins(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.read().disabled_plugins.clone())
    }

    async fn add_disabled_plugin(&self, name: &str) -> anyhow::Result<bool> {
        Ok(insert_unique(
            &mut self.write().disabled_plugins,
            &name.to_string(),
        ))
    }

    async fn remove_disabled_plugin(&self, name: &str) -> anyhow::Result<bool> {
        Ok(remove_item(
            &mut self.write().disabled_plugins,
            &name.to_string(),
        ))
    }
}
