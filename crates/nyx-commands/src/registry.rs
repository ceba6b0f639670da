//! Command registry: declaration, decoration and overload resolution.
//!
//! A [`RegistryBuilder`] accumulates descriptors in declaration order
//! ([`RegistryBuilder::register`]), patches them by handler id
//! ([`RegistryBuilder::attach_usage`], [`RegistryBuilder::attach_permission`],
//! [`RegistryBuilder::attach_guild_only`]) and finally groups them by command
//! name into an immutable [`CommandRegistry`] ([`RegistryBuilder::load`]).
//!
//! Every builder error is a wiring bug and aborts surface construction.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::{trace, warn};

use nyx_types::{PermissionFlags, PlatformPermission};

use crate::args::ParamParser;
use crate::descriptor::{CommandDescriptor, CommandSpec, HandlerId};

/// Maximum allowed length for a command name.
const MAX_COMMAND_NAME_LEN: usize = 64;

/// Errors raised while building a registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("{surface}: handler `{handler}` is declared more than once")]
    DuplicateHandler { surface: String, handler: String },

    #[error("{surface}: {decoration} attached to `{handler}`, which is not a declared command")]
    UnknownHandler {
        surface: String,
        handler: String,
        decoration: &'static str,
    },

    #[error("{surface}: handler `{handler}` declares parameter `{param}` twice")]
    DuplicateParam {
        surface: String,
        handler: String,
        param: String,
    },

    #[error("{surface}: invalid command name `{name}`: {reason}")]
    InvalidName {
        surface: String,
        name: String,
        reason: String,
    },

    #[error("{surface}: command `{command}` has more than one overload taking {arity} argument(s)")]
    DuplicateOverload {
        surface: String,
        command: String,
        arity: usize,
    },

    #[error("{surface}: overloads of `{command}` declare different argument parsers ({first} and {second})")]
    ConflictingParsers {
        surface: String,
        command: String,
        first: String,
        second: String,
    },
}

/// Accumulates descriptors for one surface.
#[derive(Debug)]
pub struct RegistryBuilder {
    surface: String,
    pending: Vec<CommandDescriptor>,
}

impl RegistryBuilder {
    /// Start a builder; `surface` names the owner in errors and logs.
    pub fn new(surface: impl Into<String>) -> Self {
        Self {
            surface: surface.into(),
            pending: Vec::new(),
        }
    }

    pub fn surface(&self) -> &str {
        &self.surface
    }

    /// Declare a handler overload. Usage and permissions start empty.
    pub fn register(&mut self, spec: CommandSpec) -> Result<&mut Self, RegistrationError> {
        validate_command_name(spec.command_name()).map_err(|reason| {
            RegistrationError::InvalidName {
                surface: self.surface.clone(),
                name: spec.command_name().to_string(),
                reason,
            }
        })?;

        if self.pending.iter().any(|d| d.function_name == spec.handler()) {
            return Err(RegistrationError::DuplicateHandler {
                surface: self.surface.clone(),
                handler: spec.handler().to_string(),
            });
        }

        let mut seen = HashSet::new();
        for param in spec.params() {
            if !seen.insert(param.name.as_str()) {
                return Err(RegistrationError::DuplicateParam {
                    surface: self.surface.clone(),
                    handler: spec.handler().to_string(),
                    param: param.name.clone(),
                });
            }
        }

        let descriptor = spec.into_descriptor();
        trace!(surface = %self.surface, descriptor = ?descriptor, "registered command");
        self.pending.push(descriptor);
        Ok(self)
    }

    /// Set usage documentation. Runs of two or more whitespace characters
    /// become a single newline, so indented multi-line literals render cleanly.
    pub fn attach_usage(
        &mut self,
        handler: HandlerId,
        usage: &str,
    ) -> Result<&mut Self, RegistrationError> {
        let normalized = normalize_usage(usage);
        self.descriptor_mut(handler, "usage")?.usage = normalized;
        Ok(self)
    }

    /// Require `flags` (any one sufficient). A non-empty `platform` list also
    /// sets [`PermissionFlags::PERMISSION`], and listing the administrator
    /// permission also sets [`PermissionFlags::ADMIN`].
    pub fn attach_permission(
        &mut self,
        handler: HandlerId,
        flags: PermissionFlags,
        platform: &[PlatformPermission],
    ) -> Result<&mut Self, RegistrationError> {
        let descriptor = self.descriptor_mut(handler, "permission constraint")?;
        let mut flags = flags;
        if platform.contains(&PlatformPermission::Administrator) {
            flags |= PermissionFlags::ADMIN;
        }
        if !platform.is_empty() {
            flags |= PermissionFlags::PERMISSION;
        }
        descriptor.permissions |= flags;
        for permission in platform {
            if !descriptor.platform_permissions.contains(permission) {
                descriptor.platform_permissions.push(*permission);
            }
        }
        Ok(self)
    }

    /// Restrict the handler to messages sent inside a guild.
    pub fn attach_guild_only(&mut self, handler: HandlerId) -> Result<&mut Self, RegistrationError> {
        self.descriptor_mut(handler, "guild-only flag")?.guild_only = true;
        Ok(self)
    }

    /// Group descriptors by command name into the final registry.
    ///
    /// Rejects two overloads with the same arity and overloads that disagree
    /// on their parser override. Commands without usage text are logged.
    pub fn load(self) -> Result<CommandRegistry, RegistrationError> {
        let mut entries: Vec<CommandEntry> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for descriptor in self.pending {
            if descriptor.usage.is_empty() {
                warn!(
                    surface = %self.surface,
                    command = %descriptor.command_name,
                    handler = descriptor.function_name,
                    "command has no usage documentation"
                );
            }

            let slot = match index.get(&descriptor.command_name) {
                Some(&slot) => slot,
                None => {
                    index.insert(descriptor.command_name.clone(), entries.len());
                    entries.push(CommandEntry {
                        name: descriptor.command_name.clone(),
                        overloads: Vec::new(),
                        parser: None,
                    });
                    entries.len() - 1
                }
            };
            let entry = &mut entries[slot];

            if entry
                .overloads
                .iter()
                .any(|d| d.num_params() == descriptor.num_params())
            {
                return Err(RegistrationError::DuplicateOverload {
                    surface: self.surface,
                    arity: descriptor.num_params(),
                    command: descriptor.command_name,
                });
            }

            if let Some(parser) = &descriptor.parser {
                match &entry.parser {
                    Some(existing) if existing != parser => {
                        return Err(RegistrationError::ConflictingParsers {
                            surface: self.surface,
                            command: descriptor.command_name.clone(),
                            first: existing.name().to_string(),
                            second: parser.name().to_string(),
                        });
                    }
                    Some(_) => {}
                    None => entry.parser = Some(parser.clone()),
                }
            }

            entry.overloads.push(descriptor);
        }

        Ok(CommandRegistry { entries, index })
    }

    fn descriptor_mut(
        &mut self,
        handler: HandlerId,
        decoration: &'static str,
    ) -> Result<&mut CommandDescriptor, RegistrationError> {
        let surface = &self.surface;
        self.pending
            .iter_mut()
            .find(|d| d.function_name == handler)
            .ok_or_else(|| RegistrationError::UnknownHandler {
                surface: surface.clone(),
                handler: handler.to_string(),
                decoration,
            })
    }
}

fn normalize_usage(usage: &str) -> String {
    static RUNS: OnceLock<Option<Regex>> = OnceLock::new();
    let trimmed = usage.trim();
    match RUNS.get_or_init(|| Regex::new(r"\s\s+").ok()) {
        Some(runs) => runs.replace_all(trimmed, "\n").into_owned(),
        None => trimmed.to_string(),
    }
}

/// Validate that a command name is a single non-empty token.
fn validate_command_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("command name must not be empty".into());
    }
    if name.len() > MAX_COMMAND_NAME_LEN {
        return Err(format!(
            "command name exceeds maximum length of {MAX_COMMAND_NAME_LEN}"
        ));
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("command name must not contain whitespace or control characters".into());
    }
    Ok(())
}

/// All overloads of one command name.
#[derive(Debug, Clone)]
struct CommandEntry {
    name: String,
    overloads: Vec<CommandDescriptor>,
    /// The parser override shared by every overload that declares one.
    parser: Option<ParamParser>,
}

/// Outcome of matching a raw argument string against a command's overloads.
#[derive(Debug)]
pub enum Resolution<'a> {
    /// No command with that name.
    Unknown,
    /// The command exists but no overload takes `arity` arguments.
    NoMatchingOverload { arity: usize },
    /// The overload to invoke and its raw tokens.
    Matched {
        descriptor: &'a CommandDescriptor,
        args: Vec<String>,
    },
}

/// Immutable mapping from command name to its overloads, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    entries: Vec<CommandEntry>,
    index: HashMap<String, usize>,
}

impl CommandRegistry {
    pub fn contains(&self, command: &str) -> bool {
        self.index.contains_key(command)
    }

    /// Overloads of `command`, in declaration order.
    pub fn overloads(&self, command: &str) -> Option<&[CommandDescriptor]> {
        self.entry(command).map(|e| e.overloads.as_slice())
    }

    /// Command names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Every descriptor, grouped by command in declaration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.entries.iter().flat_map(|e| e.overloads.iter())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parser used for `command`: its override if any, else `default`.
    pub fn parser_for<'a>(&'a self, command: &str, default: &'a ParamParser) -> &'a ParamParser {
        self.entry(command)
            .and_then(|e| e.parser.as_ref())
            .unwrap_or(default)
    }

    /// Split `raw_args` and select the overload whose arity equals the token count.
    pub fn resolve(&self, command: &str, raw_args: &str, default: &ParamParser) -> Resolution<'_> {
        let Some(entry) = self.entry(command) else {
            return Resolution::Unknown;
        };

        let parser = entry.parser.as_ref().unwrap_or(default);
        let args = parser.split(raw_args);
        let arity = args.len();

        match entry.overloads.iter().find(|d| d.num_params() == arity) {
            Some(descriptor) => Resolution::Matched { descriptor, args },
            None => Resolution::NoMatchingOverload { arity },
        }
    }

    fn entry(&self, command: &str) -> Option<&CommandEntry> {
        self.index.get(command).map(|&i| &self.entries[i])
    }
}
