//! The nyx bot: bot commands, plugin loading, voice collaborator and the
//! built-in plugins, wired onto the `nyx-commands` engine.
//!
//! # Architecture
//!
//! - [`bot`]: [`BotCommands`], the commands invoked as `!<command>`.
//! - [`help`]: help and usage pages rendered from registries.
//! - [`control`]: the [`BotControl`] trait for privileged platform operations.
//! - [`manifest`]: `manifest.toml` discovery ([`PluginManager`]) and the
//!   factory [`PluginCatalog`].
//! - [`voice`]: the [`VoiceQueue`] collaborator, [`VoiceEventBus`] and an
//!   in-memory queue.
//! - [`plugins`]: the `music` and `test` plugins.
//! - [`startup`]: [`Bot::start`], producing a ready [`nyx_commands::Dispatcher`].

pub mod bot;
pub mod control;
pub mod help;
pub mod manifest;
pub mod plugins;
pub mod startup;
pub mod voice;

#[cfg(test)]
mod testing;

pub use bot::BotCommands;
pub use control::BotControl;
pub use manifest::{
    DiscoveredPlugin, LoadedPlugin, PluginCatalog, PluginEnv, PluginManager, PluginManifest,
    MANIFEST_FILENAME,
};
pub use plugins::{MusicPlugin, TestPlugin};
pub use startup::{Bot, BotServices};
pub use voice::{
    MemoryVoiceQueue, VoiceError, VoiceEvent, VoiceEventBus, VoiceEventHandler, VoiceQueue,
    VoiceRequest, VoiceRequestId,
};
