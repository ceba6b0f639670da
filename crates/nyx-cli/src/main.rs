mod commands;
mod console;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Nyx -- a prefix-command chat bot with pluggable command sets.
#[derive(Parser, Debug)]
#[command(name = "nyx", version, about)]
struct Cli {
    /// Configuration file (defaults to ./nyx.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Extra directory whose subdirectories hold plugin manifests
    #[arg(long = "plugin-dir", global = true)]
    plugin_dirs: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bot against the terminal, one message per line
    Console {
        /// Override the configured command prefix
        #[arg(long)]
        prefix: Option<char>,

        /// User id the console speaks as
        #[arg(long, default_value = "console")]
        user: String,

        /// Display name the console speaks as
        #[arg(long, default_value = "console")]
        name: String,

        /// Give the console user the Administrator permission
        #[arg(long)]
        admin: bool,

        /// Role the console user holds (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,

        /// Voice channel available in the console guild (repeatable)
        #[arg(long = "voice-channel", default_value = "General")]
        voice_channels: Vec<String>,

        /// Voice channel the console user is connected to
        #[arg(long = "in-voice")]
        in_voice: Option<String>,
    },

    /// List plugin manifests found in the configured plugin directories
    Plugins,

    /// Validate a configuration file and its plugin manifests
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with env filter (e.g., RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref(), cli.plugin_dirs)?;

    match cli.command {
        Commands::Console {
            prefix,
            user,
            name,
            admin,
            roles,
            voice_channels,
            in_voice,
        } => {
            let identity = console::Identity {
                user_id: user,
                name,
                admin,
                roles,
                in_voice,
            };
            commands::console::run(config, prefix, identity, voice_channels).await
        }
        Commands::Plugins => commands::plugins::list(&config),
        Commands::Validate => commands::plugins::validate(&config),
    }
}
