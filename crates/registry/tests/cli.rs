// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests that drive the `secret-registry` binary.
//!
//! Each test runs the binary inside its own temp dir with a relative
//! `--secrets-dir`, so paths printed by one command are fed back to the next
//! the way a shell script would.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const CLIENT_PAYLOAD: &str = r#"{"kind":"client","client_id":"cid","client_secret":"csecret","api_base_url":"https://example.invalid"}"#;

fn registry_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_secret-registry"));
    cmd.current_dir(dir)
        .env("MASTODON_GLOBAL_SECRET", "cli-global-secret")
        .env("SECRET_REGISTRY_APP_SECRET", "cli-app-secret")
        .env_remove("SECRET_REGISTRY_DIR")
        .env_remove("SECRET_REGISTRY_LOG_LEVEL")
        .env_remove("SECRET_REGISTRY_LOG_FORMAT")
        .args(["--secrets-dir", "secrets"]);
    cmd
}

fn run(dir: &Path, args: &[&str]) -> anyhow::Result<Output> {
    Ok(registry_cmd(dir).args(args).output()?)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Resolve the client credential path and return it relative to `dir`.
fn resolve_client(dir: &Path) -> anyhow::Result<PathBuf> {
    let output = run(
        dir,
        &["resolve", "--prefix", "app", "--instance", "https://example.org", "--kind", "client"],
    )?;
    anyhow::ensure!(output.status.success(), "resolve failed: {}", stderr(&output));

    let printed = PathBuf::from(stdout(&output).trim());
    assert_eq!(printed.parent(), Some(std::fs::canonicalize(dir.join("secrets"))?.as_path()));
    let name = printed
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("no file name in {}", printed.display()))?;
    Ok(Path::new("secrets").join(name))
}

#[test]
fn resolve_touch_exists_and_sweep() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let relative = resolve_client(dir.path())?;
    let relative_str = relative.to_string_lossy().into_owned();

    let output = run(dir.path(), &["exists", &relative_str])?;
    assert_eq!(output.status.code(), Some(1), "{}", stderr(&output));

    std::fs::write(dir.path().join(&relative), CLIENT_PAYLOAD)?;
    let output = run(dir.path(), &["touch", &relative_str])?;
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));

    let output = run(dir.path(), &["exists", &relative_str])?;
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));

    let output = run(dir.path(), &["list", "--prefix", "app", "--kind", "client"])?;
    assert_eq!(output.status.code(), Some(0));
    let listed = stdout(&output);
    assert_eq!(listed.lines().count(), 1, "{listed}");
    let file_name = relative.file_name().map(|n| n.to_string_lossy().into_owned());
    assert!(listed.contains(file_name.as_deref().unwrap_or("?")), "{listed}");

    // Touched just now, so an hour-long window keeps it.
    let output = run(
        dir.path(),
        &["revoke-expired", "--prefix", "app", "--kind", "client", "--max-age-secs", "3600"],
    )?;
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    assert!(stdout(&output).is_empty(), "{}", stdout(&output));
    assert!(stderr(&output).contains("0 deleted, 0 failed, 1 kept"), "{}", stderr(&output));
    assert!(dir.path().join(&relative).is_file());

    // Without a window every credential of that kind goes.
    let output = run(dir.path(), &["revoke-expired", "--prefix", "app", "--kind", "client"])?;
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    assert!(stdout(&output).starts_with("revoked\t"), "{}", stdout(&output));
    assert!(stderr(&output).contains("1 deleted, 0 failed, 0 kept"), "{}", stderr(&output));

    let output = run(dir.path(), &["exists", &relative_str])?;
    assert_eq!(output.status.code(), Some(1));
    Ok(())
}

#[test]
fn revoke_by_relative_path() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let relative = resolve_client(dir.path())?;
    let relative_str = relative.to_string_lossy().into_owned();
    std::fs::write(dir.path().join(&relative), CLIENT_PAYLOAD)?;
    assert!(run(dir.path(), &["touch", &relative_str])?.status.success());

    let output = run(dir.path(), &["revoke", &relative_str])?;
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    assert!(stdout(&output).starts_with("revoked\t"), "{}", stdout(&output));
    assert!(!dir.path().join(&relative).exists());
    Ok(())
}

#[yare::parameterized(
    blank = { Some("   ") },
    unset = { None },
)]
fn missing_global_secret_exits_2(secret: Option<&str>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cmd = registry_cmd(dir.path());
    match secret {
        Some(secret) => cmd.env("MASTODON_GLOBAL_SECRET", secret),
        None => cmd.env_remove("MASTODON_GLOBAL_SECRET"),
    };
    let output = cmd.args(["exists", "secrets/x.secret"]).output().expect("run binary");

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("MASTODON_GLOBAL_SECRET"), "{}", stderr(&output));
}

#[test]
fn invalid_log_format_exits_2() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let output = registry_cmd(dir.path())
        .env("SECRET_REGISTRY_LOG_FORMAT", "xml")
        .args(["exists", "secrets/x.secret"])
        .output()?;
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("invalid log format"), "{}", stderr(&output));
    Ok(())
}

#[test]
fn path_outside_the_store_is_fatal() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("stray.secret"), "x")?;

    let output = run(dir.path(), &["touch", "stray.secret"])?;
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("invalid credential path"), "{}", stderr(&output));
    Ok(())
}

#[test]
fn resolve_user_without_name_is_fatal() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let output = run(
        dir.path(),
        &["resolve", "--prefix", "app", "--instance", "example.org", "--kind", "user"],
    )?;
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("must have a user"), "{}", stderr(&output));
    Ok(())
}

#[test]
fn appdata_prints_and_creates_layout() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let output = run(dir.path(), &["appdata", "--prefix", "app"])?;
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));

    let root = std::fs::canonicalize(dir.path().join("secrets"))?;
    let session = root.join("appdata").join("session_app");
    let db = root.join("appdata").join("db_app.db");
    assert_eq!(
        stdout(&output),
        format!("session_dir\t{}\ndb_file\t{}\n", session.display(), db.display())
    );
    assert!(session.is_dir());
    assert!(!db.exists());
    Ok(())
}
