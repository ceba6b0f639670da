//! Command declarations and descriptors.
//!
//! A surface declares each handler overload with a [`CommandSpec`]. The
//! registry builder turns specs into [`CommandDescriptor`]s and later patches
//! usage text, permission requirements and the guild-only flag onto them by
//! handler id.

use std::fmt;
use std::sync::Arc;

use nyx_types::{PermissionFlags, PlatformPermission};

use crate::args::{ArgConverter, ParamParser};

/// Stable identifier of a handler within its surface. Used to attach
/// decorations and to route an invocation back to the handler body.
pub type HandlerId = &'static str;

/// One declared handler parameter. The caller context is not a parameter.
#[derive(Clone)]
pub struct ParamSpec {
    pub name: String,
    /// Converter applied to this position; `None` passes the raw token.
    pub converter: Option<Arc<dyn ArgConverter>>,
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.converter {
            Some(c) => write!(f, "{}: {}", self.name, c.type_name()),
            None => f.write_str(&self.name),
        }
    }
}

/// Declaration of one handler overload.
///
/// ```
/// use nyx_commands::{CommandSpec, ParamParser};
///
/// let spec = CommandSpec::new("change_bot_name", "Change the bot's nickname")
///     .name("changebotname")
///     .param("name")
///     .parser(ParamParser::All);
/// assert_eq!(spec.command_name(), "changebotname");
/// ```
#[derive(Debug, Clone)]
pub struct CommandSpec {
    handler: HandlerId,
    description: String,
    name: Option<String>,
    params: Vec<ParamSpec>,
    parser: Option<ParamParser>,
}

impl CommandSpec {
    /// Declare handler `handler`. The command name defaults to the handler id.
    pub fn new(handler: HandlerId, description: impl Into<String>) -> Self {
        Self {
            handler,
            description: description.into(),
            name: None,
            params: Vec::new(),
            parser: None,
        }
    }

    /// Invocable command name, when it differs from the handler id.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append a raw text parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            converter: None,
        });
        self
    }

    /// Append a parameter converted by `converter`.
    #[must_use]
    pub fn converted(mut self, name: impl Into<String>, converter: impl ArgConverter + 'static) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            converter: Some(Arc::new(converter)),
        });
        self
    }

    /// Override the surface's default argument parser for this command.
    #[must_use]
    pub fn parser(mut self, parser: ParamParser) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn handler(&self) -> HandlerId {
        self.handler
    }

    pub fn command_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.handler)
    }

    pub(crate) fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub(crate) fn into_descriptor(self) -> CommandDescriptor {
        let command_name = self.command_name().to_string();
        CommandDescriptor {
            command_name,
            function_name: self.handler,
            params: self.params,
            description: self.description,
            usage: String::new(),
            permissions: PermissionFlags::empty(),
            platform_permissions: Vec::new(),
            guild_only: false,
            parser: self.parser,
        }
    }
}

/// Metadata for one handler overload.
#[derive(Debug, Clone)]
pub struct CommandDescriptor {
    pub command_name: String,
    pub function_name: HandlerId,
    pub params: Vec<ParamSpec>,
    pub description: String,
    /// Usage documentation; empty until attached.
    pub usage: String,
    pub permissions: PermissionFlags,
    /// Platform permissions required when [`PermissionFlags::PERMISSION`] is set.
    pub platform_permissions: Vec<PlatformPermission>,
    pub guild_only: bool,
    /// Parser override; `None` uses the surface default.
    pub parser: Option<ParamParser>,
}

impl CommandDescriptor {
    /// Arity, the overload discriminator.
    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn param_name(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(|p| p.name.as_str())
    }
}
