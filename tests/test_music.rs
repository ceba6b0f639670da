//! The music plugin driving the memory voice queue, with announcements
//! delivered through voice events.

mod common;

use std::sync::Arc;

use common::{member, said, World};
use nyx_bot::{MusicPlugin, TestPlugin, VoiceQueue};
use nyx_commands::{Dispatcher, Plugin};
use nyx_types::CommandError;

async fn music(world: &World) -> Dispatcher {
    let env = world.env();
    world
        .assemble(vec![
            Arc::new(MusicPlugin::new(&env)) as Arc<dyn Plugin>,
            Arc::new(TestPlugin::new(&env)) as Arc<dyn Plugin>,
        ])
        .await
}

#[tokio::test]
async fn song_starts_at_once_when_connected_and_idle() {
    let world = World::new();
    let dispatcher = music(&world).await;
    let dj = member("u1").in_voice_channel("v1");

    dispatcher.dispatch(&said(&dj, "!join")).await.unwrap();
    assert!(world.voice.is_in_voice_channel());

    let result = dispatcher
        .dispatch(&said(&dj, "!music play https://x/y"))
        .await
        .unwrap();
    assert!(result.is_success());
    assert!(world.voice.is_playing());
    assert_eq!(world.platform.texts(), vec!["**Playing :notes:** `https://x/y`"]);
}

#[tokio::test]
async fn songs_queue_while_playing_and_the_queue_drains() {
    let world = World::new();
    let dispatcher = music(&world).await;
    let dj = member("u1").in_voice_channel("v1");
    dispatcher.dispatch(&said(&dj, "!join")).await.unwrap();

    dispatcher.dispatch(&said(&dj, "!m play https://x/one")).await.unwrap();
    dispatcher.dispatch(&said(&dj, "!m play dQw4w9WgXcQ")).await.unwrap();
    assert_eq!(world.voice.pending().len(), 1);

    world.voice.finish_current().await.unwrap();
    world.voice.finish_current().await.unwrap();
    assert!(!world.voice.is_playing());

    assert_eq!(
        world.platform.texts(),
        vec![
            "**Playing :notes:** `https://x/one`",
            "**Queued** :soon: `https://www.youtube.com/watch?v=dQw4w9WgXcQ`",
            "**Playing :notes:** `https://www.youtube.com/watch?v=dQw4w9WgXcQ`",
            "**Song queue finished**",
        ]
    );
}

#[tokio::test]
async fn songs_queue_silently_until_the_bot_joins() {
    let world = World::new();
    let dispatcher = music(&world).await;
    let dj = member("u1").in_voice_channel("v1");

    dispatcher.dispatch(&said(&dj, "!music play https://x/y")).await.unwrap();
    assert!(!world.voice.is_playing());
    assert_eq!(
        dispatcher.dispatch(&said(&dj, "!music play")).await.unwrap(),
        CommandError::custom("The bot needs to be in a voice channel to play the song queue.")
    );

    dispatcher.dispatch(&said(&dj, "!join")).await.unwrap();
    assert!(dispatcher.dispatch(&said(&dj, "!music play")).await.unwrap().is_success());
    assert!(world.voice.is_playing());
    assert_eq!(
        world.platform.texts(),
        vec![
            "**Queued** :soon: `https://x/y`",
            "**Playing song queue** :notes:",
            "**Playing :notes:** `https://x/y`",
        ]
    );
}

#[tokio::test]
async fn invalid_links_are_usage_errors() {
    let world = World::new();
    let dispatcher = music(&world).await;

    assert_eq!(
        dispatcher
            .dispatch(&said(&member("u1"), "!m play not-a-song"))
            .await
            .unwrap(),
        CommandError::IncorrectPluginCommandUsage {
            tag: "music".into(),
            command: "play".into()
        }
    );
    assert!(!world.voice.has_request());
}

#[tokio::test]
async fn pause_resume_skip_and_stop() {
    let world = World::new();
    let dispatcher = music(&world).await;
    let dj = member("u1").in_voice_channel("v1");
    dispatcher.dispatch(&said(&dj, "!join")).await.unwrap();
    dispatcher.dispatch(&said(&dj, "!m play https://x/one")).await.unwrap();
    dispatcher.dispatch(&said(&dj, "!m play https://x/two")).await.unwrap();
    world.platform.clear();

    assert_eq!(
        dispatcher.dispatch(&said(&dj, "!m resume")).await.unwrap(),
        CommandError::custom("The current song isn't paused.")
    );
    dispatcher.dispatch(&said(&dj, "!m pause")).await.unwrap();
    assert!(world.voice.is_paused());
    assert_eq!(
        dispatcher.dispatch(&said(&dj, "!m pause")).await.unwrap(),
        CommandError::custom("The current song is already paused.")
    );
    dispatcher.dispatch(&said(&dj, "!m resume")).await.unwrap();
    dispatcher.dispatch(&said(&dj, "!m skip")).await.unwrap();
    dispatcher.dispatch(&said(&dj, "!m stop")).await.unwrap();
    assert!(!world.voice.has_request());

    assert_eq!(
        world.platform.texts(),
        vec![
            "**Pausing** :pause_button:",
            "**Resuming** :arrow_forward:",
            "**Skipping** :next_track:",
            "**Playing :notes:** `https://x/two`",
            "**Stopping song queue** :octagonal_sign:",
        ]
    );
    assert_eq!(
        dispatcher.dispatch(&said(&dj, "!m stop")).await.unwrap(),
        CommandError::custom("There is no song queue playing.")
    );
}

#[tokio::test]
async fn test_plugin_barks() {
    let world = World::new();
    let dispatcher = music(&world).await;

    assert!(dispatcher
        .dispatch(&said(&member("u1"), "!t woof"))
        .await
        .unwrap()
        .is_success());
    assert_eq!(world.platform.texts(), vec!["woof!"]);
}
