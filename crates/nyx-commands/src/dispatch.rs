//! Per-message dispatch: the bot phase, then the plugin phase.

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, error, warn};

use nyx_types::{CommandContext, CommandError};

use crate::gate::PermissionGate;
use crate::host::{PluginHost, Route};
use crate::parser::{parse_command, ParsedCommandInfo};
use crate::platform::Platform;
use crate::surface::{ExecEnv, Surface};

/// Sent in place of a result when a handler fails with an error.
pub const HANDLER_FAILURE_MESSAGE: &str = "Something went wrong while running that command.";

/// Whether a dispatch phase settled the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteFlow {
    Continue,
    Stop,
}

/// Routes parsed messages to the bot surface or a plugin surface.
pub struct Dispatcher {
    prefix: char,
    bot: Surface,
    plugins: Arc<PluginHost>,
    gate: PermissionGate,
    platform: Arc<dyn Platform>,
}

impl Dispatcher {
    pub fn new(
        prefix: char,
        bot: Surface,
        plugins: Arc<PluginHost>,
        gate: PermissionGate,
        platform: Arc<dyn Platform>,
    ) -> Self {
        Self {
            prefix,
            bot,
            plugins,
            gate,
            platform,
        }
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }

    pub fn bot(&self) -> &Surface {
        &self.bot
    }

    pub fn plugins(&self) -> &Arc<PluginHost> {
        &self.plugins
    }

    /// Dispatch one message and return its result without reporting it.
    ///
    /// `Err` means a collaborator failed inside a handler.
    pub async fn dispatch(&self, ctx: &CommandContext) -> anyhow::Result<CommandError> {
        let Some(info) = parse_command(&ctx.raw_content, self.prefix) else {
            return Ok(CommandError::NotACommand);
        };
        debug!(tag = %info.tag, command = %info.command, "dispatching");

        let (flow, result) = self.bot_phase(ctx, &info).await?;
        if flow == ExecuteFlow::Stop {
            return Ok(result);
        }

        let (_, result) = self.plugin_phase(ctx, &info).await?;
        Ok(result)
    }

    /// Dispatch and send exactly one message to the caller's channel when the
    /// result is a failure. Success and unprefixed text send nothing.
    ///
    /// A handler error is reported with [`HANDLER_FAILURE_MESSAGE`] and then
    /// returned.
    pub async fn dispatch_and_report(&self, ctx: &CommandContext) -> anyhow::Result<CommandError> {
        let result = match self.dispatch(ctx).await {
            Ok(result) => result,
            Err(e) => {
                error!(channel = %ctx.channel, error = %format!("{e:#}"), "command handler failed");
                if let Err(send) = self
                    .platform
                    .send_message(&ctx.channel, HANDLER_FAILURE_MESSAGE)
                    .await
                {
                    warn!(error = %send, "failed to report handler failure");
                }
                return Err(e);
            }
        };
        if !result.is_success() && result != CommandError::NotACommand {
            debug!(code = ?result.code(), "reporting failed dispatch");
            self.platform
                .send_message(&ctx.channel, &result.to_string())
                .await
                .context("failed to report command error")?;
        }
        Ok(result)
    }

    fn env(&self) -> ExecEnv<'_> {
        ExecEnv {
            gate: &self.gate,
            platform: self.platform.as_ref(),
        }
    }

    /// The tag is treated as a bot command name; arguments come from the raw
    /// content after it.
    async fn bot_phase(
        &self,
        ctx: &CommandContext,
        info: &ParsedCommandInfo,
    ) -> anyhow::Result<(ExecuteFlow, CommandError)> {
        if self.bot.is_command(&info.tag) {
            let result = self
                .bot
                .try_execute(ctx, &info.tag, &info.raw_content, &self.env())
                .await?;
            return Ok((ExecuteFlow::Stop, result));
        }

        if info.raw_content.is_empty() {
            return Ok((
                ExecuteFlow::Stop,
                CommandError::UnrecognizedBotCommand {
                    command: info.tag.clone(),
                },
            ));
        }

        Ok((ExecuteFlow::Continue, CommandError::success()))
    }

    async fn plugin_phase(
        &self,
        ctx: &CommandContext,
        info: &ParsedCommandInfo,
    ) -> anyhow::Result<(ExecuteFlow, CommandError)> {
        let collisions = self.plugins.collisions();

        if let Some(tags) = collisions.lookup(&info.tag, &info.command) {
            return Ok((
                ExecuteFlow::Stop,
                CommandError::PluginCommandCollision {
                    alias: info.tag.clone(),
                    command: info.command.clone(),
                    tags: tags.to_vec(),
                },
            ));
        }

        if collisions.is_duplicate_tag(&info.tag) {
            return Ok((
                ExecuteFlow::Stop,
                CommandError::PluginTagCollision {
                    tag: info.tag.clone(),
                },
            ));
        }

        let result = match self.plugins.route(&info.tag, &info.command) {
            Route::Found(plugin) if !plugin.state().is_enabled() => {
                debug!(tag = plugin.tag(), state = %plugin.state(), "plugin is disabled");
                CommandError::PluginDisabled {
                    tag: plugin.tag().to_string(),
                }
            }
            Route::Found(plugin) => {
                plugin
                    .try_execute(ctx, &info.command, &info.args, &self.env())
                    .await?
            }
            Route::UnknownCommand => CommandError::UnrecognizedPluginCommand {
                tag: info.tag.clone(),
                command: info.command.clone(),
            },
            Route::UnknownTag => CommandError::UnrecognizedPluginTag {
                tag: info.tag.clone(),
            },
        };

        Ok((ExecuteFlow::Stop, result))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("prefix", &self.prefix)
            .field("bot", &self.bot)
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}
