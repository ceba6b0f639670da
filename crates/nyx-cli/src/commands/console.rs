//! `nyx console`: drive the bot from the terminal.
//!
//! Every input line is handled as a chat message from the console user.
//! Lines starting with `/` are console controls rather than messages.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;
use tracing::{debug, info};

use nyx_bot::{Bot, BotServices, MemoryVoiceQueue, PluginCatalog, VoiceEventBus, VoiceQueue};
use nyx_commands::{Dispatcher, MemoryAllowlist};
use nyx_types::{BotConfig, CommandContext};

use crate::console::{
    voice_channels, ConsoleControl, ConsolePlatform, Identity, CONSOLE_CHANNEL, CONSOLE_GUILD,
};

const CONSOLE_HELP: &str = "/finish  end the current song\n/queue   list queued songs\n/quit    exit";

/// What a console control line asks for.
#[derive(Debug, PartialEq, Eq)]
enum Control {
    Finish,
    Queue,
    Quit,
    Help,
}

fn parse_control(line: &str) -> Option<Control> {
    let rest = line.strip_prefix('/')?;
    Some(match rest.trim() {
        "finish" => Control::Finish,
        "queue" => Control::Queue,
        "quit" | "exit" => Control::Quit,
        _ => Control::Help,
    })
}

pub async fn run(
    mut config: BotConfig,
    prefix: Option<char>,
    identity: Identity,
    channels: Vec<String>,
) -> Result<()> {
    if let Some(prefix) = prefix {
        config.prefix = prefix;
    }

    let shutdown = Arc::new(Notify::new());
    let voice_events = Arc::new(VoiceEventBus::new());
    let voice = Arc::new(MemoryVoiceQueue::new(voice_events.clone()));
    let member = identity.member();
    let platform = Arc::new(ConsolePlatform::new(identity.roles(), vec![member.clone()]));
    let control = Arc::new(ConsoleControl::new(
        voice_channels(&channels),
        voice.clone(),
        shutdown.clone(),
    ));

    let services = BotServices {
        platform,
        control,
        store: Arc::new(MemoryAllowlist::from_seed(config.allowlist.clone())),
        voice: voice.clone(),
        voice_events,
    };
    let dispatcher = Bot::start(&config, services, &PluginCatalog::with_builtins())
        .await
        .context("failed to start bot")?;

    println!(
        "nyx is listening. Type {}help to get started, /help for console controls.",
        config.prefix
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            biased;
            _ = shutdown.notified() => {
                info!("shutdown requested");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                if !handle_line(&dispatcher, &voice, &member, &line).await? {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Returns `false` when the console should exit.
async fn handle_line(
    dispatcher: &Dispatcher,
    voice: &MemoryVoiceQueue,
    member: &nyx_types::Member,
    line: &str,
) -> Result<bool> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(true);
    }

    if let Some(control) = parse_control(line) {
        match control {
            Control::Finish => {
                if let Err(e) = voice.finish_current().await {
                    println!("({e})");
                }
            }
            Control::Queue => {
                for (i, request) in voice.pending().iter().enumerate() {
                    println!("{}. {}", i + 1, request.url);
                }
                if !voice.has_request() {
                    println!("(queue is empty)");
                }
            }
            Control::Quit => return Ok(false),
            Control::Help => println!("{CONSOLE_HELP}"),
        }
        return Ok(true);
    }

    let ctx = CommandContext::guild(CONSOLE_GUILD, CONSOLE_CHANNEL, member.clone(), line);
    match dispatcher.dispatch_and_report(&ctx).await {
        Ok(result) if !result.is_success() => {
            debug!(code = ?result.code(), "command failed");
        }
        Ok(_) => {}
        Err(e) => debug!(error = %format!("{e:#}"), "command handler failed"),
    }
    Ok(true)
}
