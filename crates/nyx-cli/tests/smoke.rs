//! End-to-end smoke tests that run the `nyx` binary.
//!
//! Every run uses a temp directory as its working directory so no local
//! `nyx.toml` leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn nyx_cmd(cwd: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_nyx"));
    cmd.current_dir(cwd);
    cmd
}

fn write_plugins(root: &Path) {
    let music = root.join("plugins").join("music");
    fs::create_dir_all(&music).expect("create plugin dir");
    fs::write(
        music.join("manifest.toml"),
        "name = \"music\"\nversion = \"1.0.0\"\nkind = \"music\"\n",
    )
    .expect("write manifest");
}

#[test]
fn console_session_answers_commands() {
    let tmpdir = tempfile::tempdir().expect("temp dir");
    write_plugins(tmpdir.path());

    nyx_cmd(tmpdir.path())
        .args(["--plugin-dir", "plugins", "console", "--user", "u1"])
        .write_stdin("!hello\n!help tags\n!nope\n/quit\n")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Hello <@u1>")
                .and(predicate::str::contains("`music` (alias `m`)"))
                .and(predicate::str::contains("`nope` is not a bot command")),
        );
}

#[test]
fn console_exits_on_shutdown() {
    let tmpdir = tempfile::tempdir().expect("temp dir");

    nyx_cmd(tmpdir.path())
        .args(["console", "--admin"])
        .write_stdin("!shutdown\n!hello\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello").not());
}

#[test]
fn plugins_lists_manifests() {
    let tmpdir = tempfile::tempdir().expect("temp dir");
    write_plugins(tmpdir.path());

    nyx_cmd(tmpdir.path())
        .args(["--plugin-dir", "plugins", "plugins"])
        .assert()
        .success()
        .stdout(predicate::str::contains("music").and(predicate::str::contains("1.0.0")));
}

#[test]
fn validate_flags_unknown_plugins() {
    let tmpdir = tempfile::tempdir().expect("temp dir");
    fs::write(
        tmpdir.path().join("nyx.toml"),
        "prefix = \"?\"\n[plugins]\nnames = [\"ghost\"]\n",
    )
    .expect("write config");

    nyx_cmd(tmpdir.path())
        .args(["validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("plugin `ghost` is not installed"));
}

#[test]
fn invalid_config_fails_fast() {
    let tmpdir = tempfile::tempdir().expect("temp dir");
    let config = tmpdir.path().join("bad.toml");
    fs::write(&config, "prefix = \"a\"\n").expect("write config");

    nyx_cmd(tmpdir.path())
        .args(["--config"])
        .arg(&config)
        .arg("validate")
        .assert()
        .failure();
}
