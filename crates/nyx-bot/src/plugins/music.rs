//! Song queue commands on top of the voice collaborator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use async_trait::async_trait;
use tracing::debug;
use url::Url;

use nyx_commands::{
    CommandSet, CommandSpec, HandlerCall, Platform, Plugin, RegistrationError, RegistryBuilder,
};
use nyx_types::{ChannelId, CommandContext, CommandError};

use crate::manifest::{PluginEnv, PluginManifest};
use crate::voice::{VoiceEvent, VoiceEventBus, VoiceEventHandler, VoiceQueue, VoiceRequest};

const VIDEO_ID_LEN: usize = 11;
const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Normalize a song link or bare YouTube video id into a URL.
///
/// Any http(s) link with a host is returned unchanged; the voice backend
/// decides whether it can play it. An 11-character video id becomes a watch
/// URL. Anything else is rejected.
///
/// ```
/// use nyx_bot::plugins::song_url;
///
/// assert_eq!(
///     song_url("dQw4w9WgXcQ").as_deref(),
///     Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
/// );
/// assert_eq!(song_url("https://x/y").as_deref(), Some("https://x/y"));
/// assert_eq!(song_url("not a song"), None);
/// ```
pub fn song_url(input: &str) -> Option<String> {
    let is_link = Url::parse(input)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false);
    if is_link {
        return Some(input.to_string());
    }
    is_video_id(input).then(|| format!("{WATCH_URL}{input}"))
}

fn is_video_id(id: &str) -> bool {
    id.len() == VIDEO_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Announces playback progress in the channel of the latest request.
struct Announcer {
    name: String,
    platform: Arc<dyn Platform>,
    last_channel: Mutex<Option<ChannelId>>,
    /// Set by `stop` so the queue draining does not announce itself.
    was_stopped: AtomicBool,
}

#[async_trait]
impl VoiceEventHandler for Announcer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &VoiceEvent) -> anyhow::Result<()> {
        match event {
            VoiceEvent::RequestStarted(request) => {
                *self.last_channel.lock().unwrap_or_else(|e| e.into_inner()) =
                    Some(request.requested_channel.clone());
                self.platform
                    .send_message(
                        &request.requested_channel,
                        &format!("**Playing :notes:** `{}`", request.url),
                    )
                    .await?;
            }
            VoiceEvent::QueueFinished => {
                let stopped = self.was_stopped.swap(false, Ordering::SeqCst);
                let channel = self
                    .last_channel
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .clone();
                if let (false, Some(channel)) = (stopped, channel) {
                    self.platform
                        .send_message(&channel, "**Song queue finished**")
                        .await?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// The `music` plugin: queue, play, pause, resume, skip and stop songs.
pub struct MusicPlugin {
    tag: String,
    alias: Option<String>,
    platform: Arc<dyn Platform>,
    voice: Arc<dyn VoiceQueue>,
    voice_events: Arc<VoiceEventBus>,
    announcer: Arc<Announcer>,
}

impl MusicPlugin {
    pub const TAG: &'static str = "music";
    pub const ALIAS: &'static str = "m";

    pub fn new(env: &PluginEnv) -> Self {
        Self::with_tag(env, Self::TAG.to_string(), Some(Self::ALIAS.to_string()))
    }

    pub fn from_manifest(env: &PluginEnv, manifest: &PluginManifest) -> Self {
        Self::with_tag(
            env,
            manifest.tag.clone().unwrap_or_else(|| Self::TAG.to_string()),
            manifest.alias.clone().or_else(|| Some(Self::ALIAS.to_string())),
        )
    }

    fn with_tag(env: &PluginEnv, tag: String, alias: Option<String>) -> Self {
        let announcer = Arc::new(Announcer {
            name: format!("plugin:{tag}"),
            platform: env.platform.clone(),
            last_channel: Mutex::new(None),
            was_stopped: AtomicBool::new(false),
        });
        Self {
            tag,
            alias,
            platform: env.platform.clone(),
            voice: env.voice.clone(),
            voice_events: env.voice_events.clone(),
            announcer,
        }
    }

    async fn say(&self, ctx: &CommandContext, text: &str) -> anyhow::Result<()> {
        self.platform.send_message(&ctx.channel, text).await?;
        Ok(())
    }

    async fn play(&self, ctx: &CommandContext) -> anyhow::Result<CommandError> {
        if self.voice.is_playing() {
            return Ok(CommandError::custom("There is already a song queue playing."));
        }
        if !self.voice.has_request() {
            return Ok(CommandError::custom("There aren't any songs in the queue."));
        }
        if !self.voice.is_in_voice_channel() {
            return Ok(CommandError::custom(
                "The bot needs to be in a voice channel to play the song queue.",
            ));
        }

        self.say(ctx, "**Playing song queue** :notes:").await?;
        self.voice.play().await?;
        Ok(CommandError::success())
    }

    async fn play_song(&self, ctx: &CommandContext, link: &str) -> anyhow::Result<CommandError> {
        let Some(url) = song_url(link) else {
            return Ok(CommandError::IncorrectPluginCommandUsage {
                tag: self.tag.clone(),
                command: "play".to_string(),
            });
        };

        let in_voice_channel = self.voice.is_in_voice_channel();
        let already_playing = self.voice.is_playing();
        debug!(url = %url, in_voice_channel, already_playing, "queueing song");

        self.voice
            .add_request(VoiceRequest {
                requester: ctx.author.clone(),
                requested_channel: ctx.channel.clone(),
                url: url.clone(),
                start_playing: in_voice_channel,
            })
            .await?;

        if !in_voice_channel || already_playing {
            self.say(ctx, &format!("**Queued** :soon: `{url}`")).await?;
        }
        Ok(CommandError::success())
    }

    async fn stop(&self, ctx: &CommandContext) -> anyhow::Result<CommandError> {
        if !self.voice.is_playing() && !self.voice.has_request() {
            return Ok(CommandError::custom("There is no song queue playing."));
        }

        self.announcer.was_stopped.store(true, Ordering::SeqCst);
        self.say(ctx, "**Stopping song queue** :octagonal_sign:").await?;
        self.voice.stop_and_clear().await?;
        Ok(CommandError::success())
    }

    async fn pause(&self, ctx: &CommandContext) -> anyhow::Result<CommandError> {
        if !self.voice.is_playing() {
            return Ok(CommandError::custom("There is no song currently playing."));
        }
        if self.voice.is_paused() {
            return Ok(CommandError::custom("The current song is already paused."));
        }

        self.say(ctx, "**Pausing** :pause_button:").await?;
        self.voice.pause().await?;
        Ok(CommandError::success())
    }

    async fn resume(&self, ctx: &CommandContext) -> anyhow::Result<CommandError> {
        if !self.voice.is_playing() {
            return Ok(CommandError::custom("There is no song currently playing."));
        }
        if !self.voice.is_paused() {
            return Ok(CommandError::custom("The current song isn't paused."));
        }

        self.say(ctx, "**Resuming** :arrow_forward:").await?;
        self.voice.resume().await?;
        Ok(CommandError::success())
    }

    async fn skip(&self, ctx: &CommandContext) -> anyhow::Result<CommandError> {
        let Some(current) = self.voice.current_request() else {
            return Ok(CommandError::custom("There is no song currently playing."));
        };

        self.say(ctx, "**Skipping** :next_track:").await?;
        self.voice.remove_request(current).await?;
        Ok(CommandError::success())
    }
}

#[async_trait]
impl CommandSet for MusicPlugin {
    fn declare(&self, r: &mut RegistryBuilder) -> Result<(), RegistrationError> {
        r.register(CommandSpec::new("play", "Play current song queue."))?;
        r.register(
            CommandSpec::new("play_song", "Add song to current song queue.")
                .name("play")
                .param("youtube_link"),
        )?;
        r.register(CommandSpec::new("stop", "Stop the current song queue."))?;
        r.register(CommandSpec::new("pause", "Pause the current song."))?;
        r.register(CommandSpec::new("resume", "Resume the current song if paused."))?;
        r.register(CommandSpec::new("skip", "Skip the current song."))?;

        r.attach_usage(
            "play",
            "Play the current song queue if not already started.
            `!music play`
            **Example:** `!music play`",
        )?;
        r.attach_usage(
            "play_song",
            "Add song to current song queue and play the current song queue if not already started.
            `!music play <youtube_link>`
            **Example:** `!music play https://www.youtube.com/watch?v=dQw4w9WgXcQ`",
        )?;
        r.attach_usage(
            "stop",
            "Stop the current song queue.
            `!music stop`
            **Example:** `!music stop`",
        )?;
        r.attach_usage(
            "pause",
            "Pause the current song.
            `!music pause`
            **Example:** `!music pause`",
        )?;
        r.attach_usage(
            "resume",
            "Resume the current song if paused.
            `!music resume`
            **Example:** `!music resume`",
        )?;
        r.attach_usage(
            "skip",
            "Skip the current song.
            `!music skip`
            **Example:** `!music skip`",
        )?;
        Ok(())
    }

    async fn invoke(&self, call: HandlerCall<'_>) -> anyhow::Result<CommandError> {
        let ctx = call.ctx;
        match call.handler {
            "play" => self.play(ctx).await,
            "play_song" => self.play_song(ctx, call.args.text(0)?).await,
            "stop" => self.stop(ctx).await,
            "pause" => self.pause(ctx).await,
            "resume" => self.resume(ctx).await,
            "skip" => self.skip(ctx).await,
            other => bail!("music plugin has no handler `{other}`"),
        }
    }
}

#[async_trait]
impl Plugin for MusicPlugin {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn tag_alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    async fn initialize(&self) -> anyhow::Result<()> {
        self.voice_events.register(self.announcer.clone())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_pass_through() {
        for link in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "http://example.com/song.mp3",
        ] {
            assert_eq!(song_url(link).as_deref(), Some(link), "{link}");
        }
    }

    #[test]
    fn video_ids_become_watch_urls() {
        assert_eq!(
            song_url("a-b_c1234XY").as_deref(),
            Some("https://www.youtube.com/watch?v=a-b_c1234XY")
        );
    }

    #[test]
    fn rejects_everything_else() {
        for input in ["", "song", "dQw4w9WgXc!", "ftp://host/file", "mailto:me@example.com"] {
            assert_eq!(song_url(input), None, "{input:?}");
        }
    }
}
