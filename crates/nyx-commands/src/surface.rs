//! Command surfaces: the bot itself and each loaded plugin.
//!
//! A surface owns a [`CommandRegistry`] built from its [`CommandSet`]'s
//! declarations, and runs resolve, authorize, convert and invoke for one
//! command.

use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, info};

use nyx_types::{CommandContext, CommandError};

use crate::args::{convert_args, Args, ParamParser};
use crate::descriptor::HandlerId;
use crate::gate::PermissionGate;
use crate::platform::Platform;
use crate::registry::{CommandRegistry, RegistrationError, RegistryBuilder, Resolution};

/// Tag of the bot surface. Bot commands are invoked without it.
pub const BOT_SURFACE_TAG: &str = "bot";

/// Whether a plugin accepts commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PluginState {
    #[default]
    Enabled,
    /// Disabled until re-enabled or the process restarts.
    DisabledTemporary,
    /// Disabled and recorded in the persisted disabled-plugin list.
    DisabledPermanent,
}

impl PluginState {
    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enabled => "enabled",
            Self::DisabledTemporary => "disabled (temporary)",
            Self::DisabledPermanent => "disabled (permanent)",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Bot,
    Plugin,
}

/// One resolved invocation handed to a [`CommandSet`].
pub struct HandlerCall<'a> {
    pub handler: HandlerId,
    pub ctx: &'a CommandContext,
    pub args: Args,
    /// The surface that resolved the call.
    pub surface: &'a Surface,
}

/// A set of command handlers.
///
/// `declare` registers every overload and its decorations; `invoke` routes a
/// resolved call to the handler body by id. Returning `Err` from `invoke`
/// means a collaborator failed, not that the user's input was bad.
#[async_trait]
pub trait CommandSet: Send + Sync {
    fn declare(&self, registry: &mut RegistryBuilder) -> Result<(), RegistrationError>;

    /// Splitter used for commands that do not override it.
    fn default_parser(&self) -> ParamParser {
        ParamParser::Spaces
    }

    async fn invoke(&self, call: HandlerCall<'_>) -> anyhow::Result<CommandError>;
}

/// A tag-scoped command set.
#[async_trait]
pub trait Plugin: CommandSet {
    /// Unique namespace, e.g. `music`.
    fn tag(&self) -> &str;

    /// Shorthand for the tag, e.g. `m`. Not guaranteed unique.
    fn tag_alias(&self) -> Option<&str> {
        None
    }

    /// Runs once after the plugin's registry has been built.
    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

enum Handlers {
    Bot(Arc<dyn CommandSet>),
    Plugin(Arc<dyn Plugin>),
}

/// Collaborators a surface needs while executing a command.
#[derive(Clone, Copy)]
pub struct ExecEnv<'a> {
    pub gate: &'a PermissionGate,
    pub platform: &'a dyn Platform,
}

/// A registry plus the handlers behind it.
pub struct Surface {
    kind: SurfaceKind,
    tag: String,
    tag_alias: Option<String>,
    registry: CommandRegistry,
    default_parser: ParamParser,
    state: RwLock<PluginState>,
    handlers: Handlers,
}

impl Surface {
    /// Build the bot surface from its command set.
    pub fn bot(commands: Arc<dyn CommandSet>) -> Result<Self, RegistrationError> {
        let mut builder = RegistryBuilder::new(BOT_SURFACE_TAG);
        commands.declare(&mut builder)?;
        let registry = builder.load()?;
        info!(commands = registry.len(), "bot surface loaded");

        Ok(Self {
            kind: SurfaceKind::Bot,
            tag: BOT_SURFACE_TAG.to_string(),
            tag_alias: None,
            default_parser: commands.default_parser(),
            registry,
            state: RwLock::new(PluginState::Enabled),
            handlers: Handlers::Bot(commands),
        })
    }

    /// Build a plugin surface. The plugin is not initialized yet.
    pub fn plugin(plugin: Arc<dyn Plugin>) -> Result<Self, RegistrationError> {
        let mut builder = RegistryBuilder::new(plugin.tag());
        plugin.declare(&mut builder)?;
        let registry = builder.load()?;
        info!(
            tag = plugin.tag(),
            alias = plugin.tag_alias().unwrap_or("-"),
            commands = registry.len(),
            "plugin surface loaded"
        );

        Ok(Self {
            kind: SurfaceKind::Plugin,
            tag: plugin.tag().to_string(),
            tag_alias: plugin.tag_alias().map(str::to_string),
            default_parser: plugin.default_parser(),
            registry,
            state: RwLock::new(PluginState::Enabled),
            handlers: Handlers::Plugin(plugin),
        })
    }

    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn tag_alias(&self) -> Option<&str> {
        self.tag_alias.as_deref()
    }

    /// Whether `name` is this surface's tag or alias.
    pub fn answers_to(&self, name: &str) -> bool {
        self.tag == name || self.tag_alias.as_deref() == Some(name)
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn default_parser(&self) -> &ParamParser {
        &self.default_parser
    }

    pub fn is_command(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn state(&self) -> PluginState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the state, returning the previous one.
    pub fn set_state(&self, state: PluginState) -> PluginState {
        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        let previous = std::mem::replace(&mut *guard, state);
        if previous != state {
            info!(tag = %self.tag, from = %previous, to = %state, "plugin state changed");
        }
        previous
    }

    /// Run the plugin's one-time initialization. No-op for the bot surface.
    pub async fn initialize(&self) -> anyhow::Result<()> {
        match &self.handlers {
            Handlers::Bot(_) => Ok(()),
            Handlers::Plugin(plugin) => plugin.initialize().await,
        }
    }

    /// Resolve `command` against this surface and run it.
    ///
    /// Every user-facing failure is returned as a [`CommandError`]; the
    /// handler is invoked only with fully converted arguments.
    pub async fn try_execute(
        &self,
        ctx: &CommandContext,
        command: &str,
        raw_args: &str,
        env: &ExecEnv<'_>,
    ) -> anyhow::Result<CommandError> {
        let (descriptor, raw) = match self.registry.resolve(command, raw_args, &self.default_parser) {
            Resolution::Unknown => return Ok(self.unrecognized(command)),
            Resolution::NoMatchingOverload { arity } => {
                debug!(surface = %self.tag, command, arity, "no overload for argument count");
                return Ok(self.incorrect_usage(command));
            }
            Resolution::Matched { descriptor, args } => (descriptor, args),
        };

        if let Err(denied) = env.gate.authorize(ctx, descriptor).await {
            return Ok(denied);
        }

        let args = match convert_args(descriptor, raw, ctx, env.platform).await {
            Ok(args) => args,
            Err(invalid) => return Ok(invalid),
        };

        debug!(
            surface = %self.tag,
            command,
            handler = descriptor.function_name,
            "invoking handler"
        );
        let call = HandlerCall {
            handler: descriptor.function_name,
            ctx,
            args,
            surface: self,
        };
        match &self.handlers {
            Handlers::Bot(commands) => commands.invoke(call).await,
            Handlers::Plugin(plugin) => plugin.invoke(call).await,
        }
    }

    fn unrecognized(&self, command: &str) -> CommandError {
        match self.kind {
            SurfaceKind::Bot => CommandError::UnrecognizedBotCommand {
                command: command.to_string(),
            },
            SurfaceKind::Plugin => CommandError::UnrecognizedPluginCommand {
                tag: self.tag.clone(),
                command: command.to_string(),
            },
        }
    }

    fn incorrect_usage(&self, command: &str) -> CommandError {
        match self.kind {
            SurfaceKind::Bot => CommandError::IncorrectBotCommandUsage {
                command: command.to_string(),
            },
            SurfaceKind::Plugin => CommandError::IncorrectPluginCommandUsage {
                tag: self.tag.clone(),
                command: command.to_string(),
            },
        }
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("kind", &self.kind)
            .field("tag", &self.tag)
            .field("tag_alias", &self.tag_alias)
            .field("commands", &self.registry.names().collect::<Vec<_>>())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::bail;
    use nyx_types::{ChannelId, GuildId, Member, PermissionFlags, Role, User};

    use crate::args::IntegerConverter;
    use crate::descriptor::CommandSpec;
    use crate::platform::PlatformError;
    use crate::store::MemoryAllowlist;

    struct Silent;

    #[async_trait]
    impl Platform for Silent {
        async fn send_message(&self, _: &ChannelId, _: &str) -> Result<(), PlatformError> {
            Ok(())
        }

        async fn find_role(&self, _: &GuildId, _: &str) -> Option<Role> {
            None
        }

        async fn find_member(&self, _: &GuildId, _: &str) -> Option<Member> {
            None
        }
    }

    #[derive(Default)]
    struct Dice {
        rolls: AtomicUsize,
    }

    #[async_trait]
    impl CommandSet for Dice {
        fn declare(&self, r: &mut RegistryBuilder) -> Result<(), RegistrationError> {
            r.register(CommandSpec::new("roll", "Roll a die").converted("sides", IntegerConverter))?;
            r.register(CommandSpec::new("reset", "Reset the counter"))?;
            r.attach_usage("roll", "`!dice roll <sides>`")?;
            r.attach_permission("reset", PermissionFlags::ADMIN, &[])?;
            Ok(())
        }

        async fn invoke(&self, call: HandlerCall<'_>) -> anyhow::Result<CommandError> {
            match call.handler {
                "roll" => {
                    call.args.integer(0)?;
                    self.rolls.fetch_add(1, Ordering::SeqCst);
                    Ok(CommandError::success())
                }
                "reset" => Ok(CommandError::success()),
                other => bail!("dice has no handler `{other}`"),
            }
        }
    }

    #[async_trait]
    impl Plugin for Dice {
        fn tag(&self) -> &str {
            "dice"
        }

        fn tag_alias(&self) -> Option<&str> {
            Some("d")
        }
    }

    fn ctx() -> CommandContext {
        CommandContext::guild("g1", "c1", Member::new(User::new("u1", "alice")), "")
    }

    async fn run(surface: &Surface, command: &str, args: &str) -> CommandError {
        let gate = PermissionGate::new(Arc::new(MemoryAllowlist::new()));
        let env = ExecEnv {
            gate: &gate,
            platform: &Silent,
        };
        surface.try_execute(&ctx(), command, args, &env).await.unwrap()
    }

    #[tokio::test]
    async fn plugin_errors_carry_the_tag() {
        let surface = Surface::plugin(Arc::new(Dice::default())).unwrap();
        assert_eq!(
            run(&surface, "flip", "").await,
            CommandError::UnrecognizedPluginCommand {
                tag: "dice".into(),
                command: "flip".into()
            }
        );
        assert_eq!(
            run(&surface, "roll", "").await,
            CommandError::IncorrectPluginCommandUsage {
                tag: "dice".into(),
                command: "roll".into()
            }
        );
    }

    #[tokio::test]
    async fn bot_errors_have_no_tag() {
        let surface = Surface::bot(Arc::new(Dice::default())).unwrap();
        assert_eq!(
            run(&surface, "flip", "").await,
            CommandError::UnrecognizedBotCommand {
                command: "flip".into()
            }
        );
        assert_eq!(surface.tag(), BOT_SURFACE_TAG);
    }

    #[tokio::test]
    async fn converted_handler_runs_once() {
        let dice = Arc::new(Dice::default());
        let surface = Surface::plugin(dice.clone()).unwrap();

        assert!(run(&surface, "roll", "6").await.is_success());
        assert_eq!(
            run(&surface, "roll", "six").await,
            CommandError::InvalidArgumentType {
                type_name: "Integer".into(),
                arg: "sides".into(),
                value: "six".into()
            }
        );
        assert_eq!(dice.rolls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn permission_denial_is_a_value() {
        let surface = Surface::plugin(Arc::new(Dice::default())).unwrap();
        assert!(matches!(
            run(&surface, "reset", "").await,
            CommandError::InsufficientUserPermissions { .. }
        ));
    }

    #[test]
    fn state_round_trips() {
        let surface = Surface::plugin(Arc::new(Dice::default())).unwrap();
        assert!(surface.state().is_enabled());
        assert_eq!(
            surface.set_state(PluginState::DisabledTemporary),
            PluginState::Enabled
        );
        assert_eq!(surface.state(), PluginState::DisabledTemporary);
        assert!(surface.answers_to("d"));
        assert!(surface.answers_to("dice"));
        assert!(!surface.answers_to("x"));
    }
}
