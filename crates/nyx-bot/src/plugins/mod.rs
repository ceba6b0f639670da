//! Plugins shipped with the bot.

mod music;
mod test_plugin;

pub use music::{song_url, MusicPlugin};
pub use test_plugin::TestPlugin;
