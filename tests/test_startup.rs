//! Starting the bot from plugin manifests on disk.

mod common;

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use common::{member, said, World};
use nyx_bot::{Bot, PluginCatalog, MANIFEST_FILENAME};
use nyx_commands::{AllowlistStore, PluginState};
use nyx_types::{BotConfig, CommandError};

fn write_manifest(root: &Path, dir: &str, content: &str) {
    let plugin_dir = root.join(dir);
    fs::create_dir_all(&plugin_dir).unwrap();
    fs::write(plugin_dir.join(MANIFEST_FILENAME), content).unwrap();
}

fn plugin_tree() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write_manifest(
        tmp.path(),
        "music",
        "name = \"music\"\nversion = \"1.0.0\"\nkind = \"music\"\n",
    );
    write_manifest(
        tmp.path(),
        "barker",
        "name = \"barker\"\nversion = \"0.2.0\"\nkind = \"test\"\ntag = \"bark\"\nalias = \"b\"\n",
    );
    write_manifest(tmp.path(), "broken", "name = 42\n");
    write_manifest(
        tmp.path(),
        "mystery",
        "name = \"mystery\"\nversion = \"0.0.1\"\nkind = \"unheard-of\"\n",
    );
    tmp
}

fn config(tmp: &TempDir) -> BotConfig {
    BotConfig {
        plugin_dirs: vec![tmp.path().to_path_buf()],
        ..BotConfig::default()
    }
}

#[tokio::test]
async fn loads_manifests_and_skips_broken_ones() {
    let tmp = plugin_tree();
    let world = World::new();
    let dispatcher = Bot::start(&config(&tmp), world.services(), &PluginCatalog::with_builtins())
        .await
        .unwrap();

    let tags: Vec<&str> = dispatcher.plugins().plugins().iter().map(|p| p.tag()).collect();
    assert_eq!(tags, vec!["bark", "music"]);

    assert!(dispatcher
        .dispatch(&said(&member("u1"), "!b woof"))
        .await
        .unwrap()
        .is_success());
    assert_eq!(world.platform.texts(), vec!["woof!"]);
}

#[tokio::test]
async fn persisted_disabled_plugins_start_disabled() {
    let tmp = plugin_tree();
    let world = World::new();
    world.store.add_disabled_plugin("music").await.unwrap();

    let dispatcher = Bot::start(&config(&tmp), world.services(), &PluginCatalog::with_builtins())
        .await
        .unwrap();

    let music = dispatcher.plugins().find("music").unwrap();
    assert_eq!(music.state(), PluginState::DisabledPermanent);
    assert_eq!(
        dispatcher
            .dispatch(&said(&member("u1"), "!m pause"))
            .await
            .unwrap(),
        CommandError::PluginDisabled {
            tag: "music".into()
        }
    );
}

#[tokio::test]
async fn name_filter_limits_what_loads() {
    let tmp = plugin_tree();
    let world = World::new();
    let mut config = config(&tmp);
    config.plugins.names = Some(vec!["barker".into()]);

    let dispatcher = Bot::start(&config, world.services(), &PluginCatalog::with_builtins())
        .await
        .unwrap();

    assert_eq!(dispatcher.plugins().plugins().len(), 1);
    assert_eq!(
        dispatcher
            .dispatch(&said(&member("u1"), "!music pause"))
            .await
            .unwrap(),
        CommandError::UnrecognizedPluginTag {
            tag: "music".into()
        }
    );
}

#[tokio::test]
async fn two_music_plugins_with_one_tag_fail_to_start() {
    let tmp = TempDir::new().unwrap();
    write_manifest(
        tmp.path(),
        "music-a",
        "name = \"music-a\"\nversion = \"1.0.0\"\nkind = \"music\"\n",
    );
    write_manifest(
        tmp.path(),
        "music-b",
        "name = \"music-b\"\nversion = \"1.0.0\"\nkind = \"music\"\n",
    );
    let world = World::new();

    let err = Bot::start(&config(&tmp), world.services(), &PluginCatalog::with_builtins())
        .await
        .unwrap_err();
    assert!(
        format!("{err:#}").contains("already registered"),
        "unexpected error: {err:#}"
    );
}

#[tokio::test]
async fn invalid_prefix_is_rejected() {
    let world = World::new();
    let config = BotConfig {
        prefix: 'a',
        ..BotConfig::default()
    };

    assert!(Bot::start(&config, world.services(), &PluginCatalog::with_builtins())
        .await
        .is_err());
}
