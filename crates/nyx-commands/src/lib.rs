//! Command registration, resolution and dispatch for the nyx chat bot.
//!
//! Messages of the form `!<tag> <command> <args...>` (plugin commands) or
//! `!<command> <args...>` (bot commands) are parsed, routed to the surface
//! that owns the command, matched to an overload by argument count, checked
//! against the caller's permissions, converted to typed arguments and handed
//! to the handler.
//!
//! # Architecture
//!
//! - [`descriptor`]: [`CommandSpec`] declarations and the resulting [`CommandDescriptor`]s.
//! - [`registry`]: [`RegistryBuilder`] (register, then attach usage/permissions/guild-only)
//!   and the immutable [`CommandRegistry`] with overload resolution.
//! - [`parser`]: the input grammar, text to [`ParsedCommandInfo`].
//! - [`args`]: argument splitting strategies, typed converters and [`Args`].
//! - [`gate`]: the [`PermissionGate`].
//! - [`surface`]: [`CommandSet`] / [`Plugin`] traits and the [`Surface`] wrapping a registry.
//! - [`host`]: loaded plugin surfaces plus the precomputed [`CollisionMap`].
//! - [`dispatch`]: the [`Dispatcher`] running the bot phase then the plugin phase.
//! - [`platform`] / [`store`]: collaborator traits implemented outside the core, and an
//!   in-memory [`AllowlistStore`].

pub mod args;
pub mod descriptor;
pub mod dispatch;
pub mod gate;
pub mod host;
pub mod parser;
pub mod platform;
pub mod registry;
pub mod store;
pub mod surface;

pub use args::{
    convert_args, ArgConverter, ArgValue, Args, BoolConverter, IntegerConverter, MemberConverter,
    ParamParser, ParamParserType, RoleConverter,
};
pub use descriptor::{CommandDescriptor, CommandSpec, HandlerId, ParamSpec};
pub use dispatch::{Dispatcher, ExecuteFlow, HANDLER_FAILURE_MESSAGE};
pub use gate::PermissionGate;
pub use host::{CollisionMap, PluginHost, Route};
pub use parser::{parse_command, ParsedCommandInfo};
pub use platform::{AllowlistStore, Platform, PlatformError};
pub use registry::{CommandRegistry, RegistrationError, RegistryBuilder, Resolution};
pub use store::MemoryAllowlist;
pub use surface::{
    CommandSet, ExecEnv, HandlerCall, Plugin, PluginState, Surface, SurfaceKind, BOT_SURFACE_TAG,
};
