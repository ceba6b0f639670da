use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;

use nyx_commands::{CommandSet, CommandSpec, HandlerCall, Platform, Plugin, RegistrationError, RegistryBuilder};
use nyx_types::CommandError;

use crate::manifest::{PluginEnv, PluginManifest};

/// Minimal plugin used to check that plugin dispatch works end to end.
pub struct TestPlugin {
    tag: String,
    alias: Option<String>,
    platform: Arc<dyn Platform>,
}

impl TestPlugin {
    pub const TAG: &'static str = "test";
    pub const ALIAS: &'static str = "t";

    pub fn new(env: &PluginEnv) -> Self {
        Self {
            tag: Self::TAG.to_string(),
            alias: Some(Self::ALIAS.to_string()),
            platform: env.platform.clone(),
        }
    }

    pub fn from_manifest(env: &PluginEnv, manifest: &PluginManifest) -> Self {
        let mut plugin = Self::new(env);
        if let Some(tag) = &manifest.tag {
            plugin.tag = tag.clone();
        }
        if let Some(alias) = &manifest.alias {
            plugin.alias = Some(alias.clone());
        }
        plugin
    }
}

#[async_trait]
impl CommandSet for TestPlugin {
    fn declare(&self, r: &mut RegistryBuilder) -> Result<(), RegistrationError> {
        r.register(CommandSpec::new("woof", "Woof!"))?;
        r.attach_usage(
            "woof",
            "Woof!
            `!test woof`
            **Example:** `!test woof`",
        )?;
        Ok(())
    }

    async fn invoke(&self, call: HandlerCall<'_>) -> anyhow::Result<CommandError> {
        match call.handler {
            "woof" => {
                self.platform.send_message(&call.ctx.channel, "woof!").await?;
                Ok(CommandError::success())
            }
            other => bail!("test plugin has no handler `{other}`"),
        }
    }
}

impl Plugin for TestPlugin {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn tag_alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}
