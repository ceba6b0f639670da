//! The bot's own commands, invoked as `!<command>` without a tag.

use std::sync::{Arc, Mutex};

use anyhow::bail;
use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use nyx_commands::{
    AllowlistStore, BoolConverter, CommandRegistry, CommandSet, CommandSpec, HandlerCall,
    MemberConverter, ParamParser, Platform, PlatformError, PluginHost, PluginState,
    RegistrationError, RegistryBuilder, RoleConverter,
};
use nyx_types::{CommandContext, CommandError, Member, PermissionFlags, Role, UserId};

use crate::control::BotControl;
use crate::help::{self, HelpPage};
use crate::voice::{VoiceError, VoiceEvent, VoiceEventBus, VoiceEventHandler};

const AVATAR_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];

/// Caller who brought the bot into its current voice channel.
///
/// Cleared whenever the voice backend reports the bot left, whatever the
/// cause.
#[derive(Default)]
struct VoiceStarter(Mutex<Option<UserId>>);

impl VoiceStarter {
    const HANDLER_NAME: &'static str = "bot-voice-starter";

    fn get(&self) -> Option<UserId> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set(&self, user: Option<UserId>) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = user;
    }
}

#[async_trait]
impl VoiceEventHandler for VoiceStarter {
    fn name(&self) -> &str {
        Self::HANDLER_NAME
    }

    async fn handle(&self, event: &VoiceEvent) -> anyhow::Result<()> {
        if matches!(event, VoiceEvent::LeftChannel) {
            debug!("left voice, forgetting who started it");
            self.set(None);
        }
        Ok(())
    }
}

/// Handlers behind the bot surface.
pub struct BotCommands {
    prefix: char,
    platform: Arc<dyn Platform>,
    control: Arc<dyn BotControl>,
    plugins: Arc<PluginHost>,
    store: Arc<dyn AllowlistStore>,
    voice_starter: Arc<VoiceStarter>,
}

impl BotCommands {
    pub fn new(
        prefix: char,
        platform: Arc<dyn Platform>,
        control: Arc<dyn BotControl>,
        plugins: Arc<PluginHost>,
        store: Arc<dyn AllowlistStore>,
    ) -> Self {
        Self {
            prefix,
            platform,
            control,
            plugins,
            store,
            voice_starter: Arc::default(),
        }
    }

    /// Track voice disconnects on `bus` so `leave` never checks a stale
    /// starter.
    pub fn watch_voice(&self, bus: &VoiceEventBus) -> Result<(), VoiceError> {
        bus.register(self.voice_starter.clone())
    }

    async fn say(&self, ctx: &CommandContext, text: &str) -> anyhow::Result<()> {
        self.platform.send_message(&ctx.channel, text).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bot identity
    // -----------------------------------------------------------------------

    async fn change_bot_avatar(&self, image_url: &str) -> anyhow::Result<CommandError> {
        let Some(url) = avatar_url(image_url) else {
            return Ok(CommandError::IncorrectBotCommandUsage {
                command: "changebotavatar".to_string(),
            });
        };

        match self.control.set_avatar(&url).await {
            Ok(()) => {
                info!(url = %url, "bot avatar changed");
                Ok(CommandError::success())
            }
            Err(PlatformError::MissingPermission(_)) => Ok(CommandError::InsufficientBotPermissions {
                command: "changebotavatar".to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn change_bot_name(&self, ctx: &CommandContext, name: &str) -> anyhow::Result<CommandError> {
        let Some(guild) = &ctx.guild else {
            return Ok(guild_only("changebotname"));
        };

        match self.control.set_nickname(guild, name).await {
            Ok(()) => {
                info!(guild = %guild, name, "bot nickname changed");
                Ok(CommandError::success())
            }
            Err(PlatformError::MissingPermission(_)) => Ok(CommandError::InsufficientBotPermissions {
                command: "changebotname".to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn hello(&self, ctx: &CommandContext) -> anyhow::Result<CommandError> {
        self.say(ctx, &format!("Hello <@{}>", ctx.author.id)).await?;
        Ok(CommandError::success())
    }

    // -----------------------------------------------------------------------
    // Help and usage
    // -----------------------------------------------------------------------

    async fn help(
        &self,
        ctx: &CommandContext,
        registry: &CommandRegistry,
        page: &str,
    ) -> anyhow::Result<CommandError> {
        let text = match HelpPage::select(page, &self.plugins) {
            HelpPage::HowTo => help::how_to(self.prefix),
            HelpPage::Bot => help::bot_help(self.prefix, registry),
            HelpPage::All => {
                let mut text = help::bot_help(self.prefix, registry);
                for plugin in self.plugins.plugins() {
                    text.push('\n');
                    text.push_str(&help::plugin_help(self.prefix, plugin));
                }
                text
            }
            HelpPage::Plugins => help::plugin_list(&self.plugins),
            HelpPage::Plugin(plugin) => help::plugin_help(self.prefix, plugin),
            HelpPage::Unknown => {
                return Ok(CommandError::custom(format!(
                    "There is no help page called `{page}`."
                )))
            }
        };
        self.say(ctx, &text).await?;
        Ok(CommandError::success())
    }

    async fn usage_bot(
        &self,
        ctx: &CommandContext,
        registry: &CommandRegistry,
        command: &str,
    ) -> anyhow::Result<CommandError> {
        let Some(overloads) = registry.overloads(command) else {
            return Ok(CommandError::UnrecognizedBotCommand {
                command: command.to_string(),
            });
        };
        self.send_usage(ctx, command, overloads).await
    }

    async fn usage_plugin(
        &self,
        ctx: &CommandContext,
        tag: &str,
        command: &str,
    ) -> anyhow::Result<CommandError> {
        let Some(plugin) = self.plugins.find(tag) else {
            return Ok(CommandError::UnrecognizedPluginTag {
                tag: tag.to_string(),
            });
        };
        let Some(overloads) = plugin.registry().overloads(command) else {
            return Ok(CommandError::UnrecognizedPluginCommand {
                tag: tag.to_string(),
                command: command.to_string(),
            });
        };
        self.send_usage(ctx, &format!("{} {command}", plugin.tag()), overloads)
            .await
    }

    async fn send_usage(
        &self,
        ctx: &CommandContext,
        title: &str,
        overloads: &[nyx_commands::CommandDescriptor],
    ) -> anyhow::Result<CommandError> {
        let text = help::usage_text(title, overloads)
            .unwrap_or_else(|| "This command does not have any usage documentation.".to_string());
        self.say(ctx, &text).await?;
        Ok(CommandError::success())
    }

    // -----------------------------------------------------------------------
    // Voice
    // -----------------------------------------------------------------------

    async fn join(&self, ctx: &CommandContext) -> anyhow::Result<CommandError> {
        let Some(member) = &ctx.member else {
            return Ok(guild_only("join"));
        };
        let Some(channel) = &member.voice_channel else {
            self.say(ctx, "You are not currently in a voice channel.").await?;
            return Ok(CommandError::success());
        };

        self.control.join_voice_channel(channel).await?;
        self.voice_starter.set(Some(ctx.author.id.clone()));
        Ok(CommandError::success())
    }

    async fn join_channel(&self, ctx: &CommandContext, name: &str) -> anyhow::Result<CommandError> {
        let Some(guild) = &ctx.guild else {
            return Ok(guild_only("join"));
        };

        let lowered = name.to_lowercase();
        let candidates: Vec<_> = self
            .control
            .voice_channels(guild)
            .await
            .into_iter()
            .filter(|c| c.name.to_lowercase() == lowered)
            .collect();

        let selected = match candidates.as_slice() {
            [] => {
                self.say(ctx, &format!("There is no voice channel called `{name}`."))
                    .await?;
                return Ok(CommandError::success());
            }
            [only] => Some(only),
            many => {
                debug!(name, matches = many.len(), "several voice channels match, using exact case");
                many.iter().find(|c| c.name == name)
            }
        };

        let Some(channel) = selected else {
            self.say(
                ctx,
                "There is more than one channel with this name. Please use the correct capitalization to join a specific one.",
            )
            .await?;
            return Ok(CommandError::success());
        };

        self.control.join_voice_channel(&channel.id).await?;
        self.voice_starter.set(Some(ctx.author.id.clone()));
        Ok(CommandError::success())
    }

    /// Only the caller who brought the bot in, or an administrator, may
    /// make it leave.
    async fn leave(&self, ctx: &CommandContext) -> anyhow::Result<CommandError> {
        let Some(starter) = self.voice_starter.get() else {
            self.say(ctx, "I am not connected to any voice channel!").await?;
            return Ok(CommandError::success());
        };

        if starter != ctx.author.id && !ctx.is_admin() {
            return Ok(CommandError::InsufficientUserPermissions {
                command: "leave".to_string(),
                permission: PermissionFlags::ADMIN,
            });
        }

        self.control.leave_voice_channel().await?;
        self.voice_starter.set(None);
        Ok(CommandError::success())
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    async fn disable_plugin(
        &self,
        ctx: &CommandContext,
        tag: &str,
        permanent: bool,
    ) -> anyhow::Result<CommandError> {
        let state = if permanent {
            PluginState::DisabledPermanent
        } else {
            PluginState::DisabledTemporary
        };
        let Some((plugin_tag, previous)) = self.plugin_state(tag) else {
            return Ok(CommandError::UnrecognizedPluginTag {
                tag: tag.to_string(),
            });
        };

        // The store is written before the in-memory state so a failed write
        // leaves both untouched.
        if permanent {
            self.store.add_disabled_plugin(&plugin_tag).await?;
        } else if previous == PluginState::DisabledPermanent {
            self.store.remove_disabled_plugin(&plugin_tag).await?;
        }
        self.plugins.set_state(&plugin_tag, state);
        info!(plugin = %plugin_tag, permanent, "plugin disabled");

        let text = if permanent {
            format!("Plugin `{plugin_tag}` has been disabled permanently.")
        } else {
            format!("Plugin `{plugin_tag}` has been disabled until restart.")
        };
        self.say(ctx, &text).await?;
        Ok(CommandError::success())
    }

    async fn enable_plugin(&self, ctx: &CommandContext, tag: &str) -> anyhow::Result<CommandError> {
        let Some((plugin_tag, _)) = self.plugin_state(tag) else {
            return Ok(CommandError::UnrecognizedPluginTag {
                tag: tag.to_string(),
            });
        };
        self.store.remove_disabled_plugin(&plugin_tag).await?;
        self.plugins.set_state(&plugin_tag, PluginState::Enabled);
        info!(plugin = %plugin_tag, "plugin enabled");

        self.say(ctx, &format!("Plugin `{plugin_tag}` has been enabled."))
            .await?;
        Ok(CommandError::success())
    }

    /// Canonical tag and current state of the plugin with tag or alias `name`.
    fn plugin_state(&self, name: &str) -> Option<(String, PluginState)> {
        self.plugins
            .find(name)
            .map(|plugin| (plugin.tag().to_string(), plugin.state()))
    }

    async fn set_role(
        &self,
        ctx: &CommandContext,
        role: &Role,
        register: bool,
    ) -> anyhow::Result<CommandError> {
        let Some(guild) = &ctx.guild else {
            return Ok(guild_only(if register { "registerrole" } else { "unregisterrole" }));
        };
        let changed = if register {
            self.store.register_role(guild, &role.id).await?
        } else {
            self.store.unregister_role(guild, &role.id).await?
        };
        let text = match (register, changed) {
            (true, true) => format!("Role `{}` has been registered.", role.name),
            (true, false) => format!("Role `{}` is already registered.", role.name),
            (false, true) => format!("Role `{}` has been unregistered.", role.name),
            (false, false) => format!("Role `{}` is not registered.", role.name),
        };
        self.say(ctx, &text).await?;
        Ok(CommandError::success())
    }

    async fn set_user(
        &self,
        ctx: &CommandContext,
        member: &Member,
        register: bool,
    ) -> anyhow::Result<CommandError> {
        let Some(guild) = &ctx.guild else {
            return Ok(guild_only(if register { "registeruser" } else { "unregisteruser" }));
        };
        let user = &member.user.id;
        let changed = if register {
            self.store.register_user(guild, user).await?
        } else {
            self.store.unregister_user(guild, user).await?
        };
        let name = member.display_name();
        let text = match (register, changed) {
            (true, true) => format!("User `{name}` has been registered."),
            (true, false) => format!("User `{name}` is already registered."),
            (false, true) => format!("User `{name}` has been unregistered."),
            (false, false) => format!("User `{name}` is not registered."),
        };
        self.say(ctx, &text).await?;
        Ok(CommandError::success())
    }
}

fn guild_only(command: &str) -> CommandError {
    CommandError::GuildOnlyCommand {
        command: command.to_string(),
    }
}

/// An http(s) link to a PNG or JPG image.
fn avatar_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let path = url.path().to_ascii_lowercase();
    AVATAR_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(ext))
        .then_some(url)
}

#[async_trait]
impl CommandSet for BotCommands {
    fn declare(&self, r: &mut RegistryBuilder) -> Result<(), RegistrationError> {
        r.register(
            CommandSpec::new(
                "change_bot_avatar",
                "Change the bot's avatar image. Url must be a PNG or JPG image.",
            )
            .name("changebotavatar")
            .param("image_url")
            .parser(ParamParser::All),
        )?;
        r.register(
            CommandSpec::new("change_bot_name", "Change the name of the bot to <name>")
                .name("changebotname")
                .param("name")
                .parser(ParamParser::All),
        )?;
        r.register(CommandSpec::new("hello", "Say Hello"))?;
        r.register(CommandSpec::new("help", "Provides the basic help page"))?;
        r.register(
            CommandSpec::new(
                "help_page",
                "Provides the help page for a specific part of the bot or its plugins",
            )
            .name("help")
            .param("pagename"),
        )?;
        r.register(CommandSpec::new("join", "Join the voice channel you are currently in"))?;
        r.register(
            CommandSpec::new("join_channel", "Join voice channel with given name")
                .name("join")
                .param("channel"),
        )?;
        r.register(CommandSpec::new("leave", "Leave the current voice channel"))?;
        r.register(CommandSpec::new(
            "shutdown",
            "Shutdown the bot (requires server admin permission)",
        ))?;
        r.register(CommandSpec::new("usage", "Get the basic help page for the usage command"))?;
        r.register(
            CommandSpec::new("usage_bot", "Shows the usage for a bot command")
                .name("usage")
                .param("botcommand"),
        )?;
        r.register(
            CommandSpec::new("usage_plugin", "Shows the usage for a plugin command")
                .name("usage")
                .param("tag")
                .param("command"),
        )?;
        r.register(
            CommandSpec::new("disable_plugin", "Disable a plugin until the bot restarts")
                .name("disableplugin")
                .param("tag"),
        )?;
        r.register(
            CommandSpec::new("disable_plugin_permanent", "Disable a plugin, optionally for good")
                .name("disableplugin")
                .param("tag")
                .converted("permanent", BoolConverter),
        )?;
        r.register(
            CommandSpec::new("enable_plugin", "Enable a disabled plugin")
                .name("enableplugin")
                .param("tag"),
        )?;
        r.register(
            CommandSpec::new("register_role", "Allow a role to use role-restricted commands")
                .name("registerrole")
                .converted("role", RoleConverter),
        )?;
        r.register(
            CommandSpec::new("unregister_role", "Remove a role from the registered roles")
                .name("unregisterrole")
                .converted("role", RoleConverter),
        )?;
        r.register(
            CommandSpec::new("register_user", "Allow a user to use user-restricted commands")
                .name("registeruser")
                .converted("user", MemberConverter),
        )?;
        r.register(
            CommandSpec::new("unregister_user", "Remove a user from the registered users")
                .name("unregisteruser")
                .converted("user", MemberConverter),
        )?;

        r.attach_usage(
            "change_bot_avatar",
            "Changes the bot's avatar to the image you provide.
            `!changebotavatar <image_url>`
            **Example:** `!changebotavatar https://www.website.com/url_to_image.png`",
        )?;
        r.attach_usage(
            "change_bot_name",
            "Changes the bot's server nickname to the name you provide.
            `!changebotname <name>`
            **Example:** `!changebotname He-man, Master of the Universe`",
        )?;
        r.attach_usage(
            "hello",
            "Says hello!
            `!hello`
            **Example:** `!hello`",
        )?;
        r.attach_usage(
            "help",
            "Displays the basic howto message for the bot. This explains how to use commands.
            `!help`
            **Example:** `!help`",
        )?;
        r.attach_usage(
            "help_page",
            "Displays the help for the bot or a specific plugin. This shows the different commands available.
            `!help <pagename>`
            **Example for bot:** `!help bot`
            **Example for plugin:** `!help music`",
        )?;
        r.attach_usage(
            "join",
            "Tells the bot to join the voice channel you are currently in.
            `!join`
            **Example:** `!join`",
        )?;
        r.attach_usage(
            "join_channel",
            "Tells the bot to join the voice channel with the given name. This is not case sensitive unless there are multiple channels with the same name. If there are multiple channels with the same name you will need to provide the exact, case sensitive, name.
            `!join <channel>`
            **Example when not case sensitive:** `!join general`
            **Example when case sensitive:** `!join GeNerAl`",
        )?;
        r.attach_usage(
            "leave",
            "Tells the bot to leave the voice channel it is currently in. Only the person who brought it into the voice channel (or an admin) can do this.
            `!leave`
            **Example:** `!leave`",
        )?;
        r.attach_usage(
            "shutdown",
            "Shuts down the bot. This can only be done by an admin.
            `!shutdown`
            **Example:** `!shutdown`",
        )?;
        r.attach_usage(
            "usage",
            "Provides documentation on usage:
            `!usage`",
        )?;
        r.attach_usage(
            "usage_bot",
            "Provides documentation on the bot command you specify:
            `!usage <botcommand>`
            **Example:** `!usage help`",
        )?;
        r.attach_usage(
            "usage_plugin",
            "Provides documentation on the plugin command you specify:
            `!usage <tag> <command>`
            **Example with plugin tag:** `!usage music play`
            **Example with plugin alias:** `!usage m play`",
        )?;
        r.attach_usage(
            "disable_plugin",
            "Disables a plugin until the bot restarts.
            `!disableplugin <tag>`
            **Example:** `!disableplugin music`",
        )?;
        r.attach_usage(
            "disable_plugin_permanent",
            "Disables a plugin. When permanent is true the plugin stays disabled after a restart.
            `!disableplugin <tag> <permanent>`
            **Example:** `!disableplugin music true`",
        )?;
        r.attach_usage(
            "enable_plugin",
            "Enables a disabled plugin.
            `!enableplugin <tag>`
            **Example:** `!enableplugin music`",
        )?;
        r.attach_usage(
            "register_role",
            "Registers a role so its members can use role-restricted commands.
            `!registerrole <role>`
            **Example:** `!registerrole DJ`",
        )?;
        r.attach_usage(
            "unregister_role",
            "Unregisters a previously registered role.
            `!unregisterrole <role>`
            **Example:** `!unregisterrole DJ`",
        )?;
        r.attach_usage(
            "register_user",
            "Registers a user so they can use user-restricted commands.
            `!registeruser <user>`
            **Example:** `!registeruser @alice`",
        )?;
        r.attach_usage(
            "unregister_user",
            "Unregisters a previously registered user.
            `!unregisteruser <user>`
            **Example:** `!unregisteruser @alice`",
        )?;

        r.attach_guild_only("change_bot_name")?;
        r.attach_guild_only("join")?;
        r.attach_guild_only("join_channel")?;
        r.attach_permission("change_bot_avatar", PermissionFlags::ADMIN, &[])?;
        r.attach_permission("shutdown", PermissionFlags::ADMIN, &[])?;
        for handler in [
            "disable_plugin",
            "disable_plugin_permanent",
            "enable_plugin",
            "register_role",
            "unregister_role",
            "register_user",
            "unregister_user",
        ] {
            r.attach_permission(handler, PermissionFlags::ADMIN, &[])?;
            r.attach_guild_only(handler)?;
        }
        Ok(())
    }

    async fn invoke(&self, call: HandlerCall<'_>) -> anyhow::Result<CommandError> {
        let HandlerCall {
            handler,
            ctx,
            args,
            surface,
        } = call;
        let registry = surface.registry();

        match handler {
            "change_bot_avatar" => self.change_bot_avatar(args.text(0)?).await,
            "change_bot_name" => self.change_bot_name(ctx, args.text(0)?).await,
            "hello" => self.hello(ctx).await,
            "help" => self.help(ctx, registry, "").await,
            "help_page" => self.help(ctx, registry, args.text(0)?).await,
            "join" => self.join(ctx).await,
            "join_channel" => self.join_channel(ctx, args.text(0)?).await,
            "leave" => self.leave(ctx).await,
            "shutdown" => {
                info!(user = %ctx.author.id, "shutdown requested");
                self.control.request_shutdown().await;
                Ok(CommandError::success())
            }
            "usage" => {
                self.say(ctx, &help::usage_how_to()).await?;
                self.usage_bot(ctx, registry, "usage").await
            }
            "usage_bot" => self.usage_bot(ctx, registry, args.text(0)?).await,
            "usage_plugin" => {
                self.usage_plugin(ctx, args.text(0)?, args.text(1)?)
                    .await
            }
            "disable_plugin" => self.disable_plugin(ctx, args.text(0)?, false).await,
            "disable_plugin_permanent" => {
                self.disable_plugin(ctx, args.text(0)?, args.bool(1)?)
                    .await
            }
            "enable_plugin" => self.enable_plugin(ctx, args.text(0)?).await,
            "register_role" => self.set_role(ctx, args.role(0)?, true).await,
            "unregister_role" => self.set_role(ctx, args.role(0)?, false).await,
            "register_user" => self.set_user(ctx, args.member(0)?, true).await,
            "unregister_user" => self.set_user(ctx, args.member(0)?, false).await,
            other => bail!("bot has no handler `{other}`"),
        }
    }
}
