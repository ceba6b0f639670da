//! Help and usage pages rendered from command registries.

use std::fmt::Write;

use nyx_commands::{CommandDescriptor, CommandRegistry, PluginHost, Surface};

/// A help page selected by name.
#[derive(Debug)]
pub enum HelpPage<'a> {
    HowTo,
    Bot,
    All,
    Plugins,
    Plugin(&'a Surface),
    Unknown,
}

impl<'a> HelpPage<'a> {
    /// `""` is the how-to page; anything else not reserved is a plugin tag or alias.
    pub fn select(name: &str, plugins: &'a PluginHost) -> Self {
        match name {
            "" => Self::HowTo,
            "bot" => Self::Bot,
            "all" => Self::All,
            "plugin" | "plugins" | "tags" => Self::Plugins,
            other => plugins.find(other).map_or(Self::Unknown, |p| Self::Plugin(p)),
        }
    }
}

pub fn how_to(prefix: char) -> String {
    format!(
        "__**How to use commands:**__\n\
         The command structure is like this: `{p}<tag> <command> <arguments>`\n\n\
         You must always start with an `{p}` and this is immediately followed with a `tag`. \
         Each plugin has its own specific tag which you have to use to execute one of its commands. \
         These tags are *unique* and no two plugins will have the same one.\n\n\
         Since these tags can get long and tedious, each plugin also has an `alias`. \
         You can use this instead of the tag to reduce typing. \
         If two plugins have the same alias, you will have to use the tag.\n\n\
         Plugins might also have commands. This is what follows the tag, separated with a space. \
         See the help page for a plugin to know what commands it has.\n\n\
         Some commands don't require any additional arguments, to learn more about how commands are used, type `{p}usage`\n\n\
         The bot also has special commands which follow a slightly different command structure than plugins. \
         They are just `{p}<command>`. These are unique to the bot itself and a plugin will never do this.\n\n\
         **Example plugin command 1:** `{p}music play`\n\
         **Example plugin command 2:** `{p}m play dQw4w9WgXcQ`\n\
         **Example bot command:** `{p}hello`\n\n\
         __**More help:**__\n\
         To see which commands the bot has, type `{p}help bot`\n\
         To see which plugins the bot has, type `{p}help plugins` or `{p}help tags`\n\
         To see which commands a plugin has, type `{p}help <tag>` or `{p}help <alias>`\n\
         To see all commands available for the bot and all plugins, type `{p}help all`\n",
        p = prefix
    )
}

/// One line per overload: `` `!name <param>` - description ``.
fn command_lines(out: &mut String, invocation: &str, registry: &CommandRegistry) {
    for descriptor in registry.descriptors() {
        let _ = write!(out, "`{invocation}{}", descriptor.command_name);
        for param in descriptor.param_names() {
            let _ = write!(out, " <{param}>");
        }
        let _ = writeln!(out, "` - {}", descriptor.description);
    }
}

pub fn bot_help(prefix: char, registry: &CommandRegistry) -> String {
    let mut out = String::from("__**Basic Commands:**__\n");
    command_lines(&mut out, &prefix.to_string(), registry);
    out
}

pub fn plugin_help(prefix: char, plugin: &Surface) -> String {
    let mut out = format!("__**Commands for {}", plugin.tag());
    if let Some(alias) = plugin.tag_alias() {
        let _ = write!(out, " (alias `{alias}`)");
    }
    out.push_str(":**__\n");
    command_lines(&mut out, &format!("{prefix}{} ", plugin.tag()), plugin.registry());
    out
}

pub fn plugin_list(plugins: &PluginHost) -> String {
    if plugins.plugins().is_empty() {
        return "There are no plugins loaded.".to_string();
    }
    let mut out = String::from("__**Plugins:**__\n");
    for plugin in plugins.plugins() {
        let _ = write!(out, "`{}`", plugin.tag());
        if let Some(alias) = plugin.tag_alias() {
            let _ = write!(out, " (alias `{alias}`)");
        }
        if !plugin.state().is_enabled() {
            let _ = write!(out, " - {}", plugin.state());
        }
        out.push('\n');
    }
    out
}

pub fn usage_how_to() -> String {
    "__**How to use usage:**__\n\
     Usage is a command designed to help you understand how to use commands. \
     When you provide a command, it will display the command's structure and examples for how to use it.\n"
        .to_string()
}

/// Usage text of every overload, or `None` when none is documented.
pub fn usage_text(title: &str, overloads: &[CommandDescriptor]) -> Option<String> {
    let documented: Vec<&str> = overloads
        .iter()
        .map(|d| d.usage.as_str())
        .filter(|u| !u.is_empty())
        .collect();
    if documented.is_empty() {
        return None;
    }
    Some(format!("__**Usage for {title}:**__\n{}\n", documented.join("\n\n")))
}
