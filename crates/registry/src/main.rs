// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;
use tracing::error;

use secret_registry::appdata::AppData;
use secret_registry::config::{Command, Config, LoginArgs};
use secret_registry::login::LoginFlow;
use secret_registry::mastodon::MastodonClient;
use secret_registry::{Registry, RevokeOutcome};

fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&config);

    match run(config) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("fatal: {e:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}

fn run(config: Config) -> anyhow::Result<i32> {
    let api = match &config.command {
        Command::Login(args) => {
            let scopes: Vec<&str> = args.scopes.iter().map(String::as_str).collect();
            MastodonClient::with_scopes(&scopes)?
        }
        _ => MastodonClient::new()?,
    };
    let api = Arc::new(api);
    let registry = Registry::open(config.secrets_dir(), config.global_secret(), api.clone())?;

    match config.command {
        Command::Login(args) => login(&registry, api.as_ref(), &args),
        Command::Resolve(args) => {
            let kind = args.credential_kind()?;
            let path =
                registry.resolve_name(&args.app.prefix, &args.app.app_secret, &args.instance, &kind)?;
            println!("{}", path.display());
            Ok(0)
        }
        Command::Exists { path } => Ok(if registry.exists(&path)? { 0 } else { 1 }),
        Command::Touch { path } => {
            registry.with_lock(|reg| reg.touch(&path))?;
            Ok(0)
        }
        Command::Revoke { path } => {
            let outcome = registry.with_lock(|reg| reg.revoke(&path))?;
            print_outcome(&path, &outcome);
            Ok(if outcome.is_deleted() { 0 } else { 1 })
        }
        Command::RevokeExpired(args) => {
            let cutoff = args.max_age_secs.map(|secs| {
                SystemTime::now().checked_sub(Duration::from_secs(secs)).unwrap_or(UNIX_EPOCH)
            });
            let report = registry.with_lock(|reg| {
                reg.revoke_expired(&args.list.prefix, args.list.kind, cutoff)
            })?;
            for path in &report.revoked {
                println!("revoked\t{}", path.display());
            }
            for (path, err) in &report.remote_failed {
                println!("deleted\t{}\t(remote: {err})", path.display());
            }
            for (path, err) in &report.local_failed {
                println!("failed\t{}\t{err}", path.display());
            }
            eprintln!(
                "{} deleted, {} failed, {} kept",
                report.deleted_count(),
                report.local_failed.len(),
                report.kept.len()
            );
            Ok(if report.local_failed.is_empty() { 0 } else { 1 })
        }
        Command::List(args) => {
            for path in registry.list(&args.prefix, args.kind)? {
                println!("{:.3}\t{}", registry.meta_time(&path)?, path.display());
            }
            Ok(0)
        }
        Command::Appdata { prefix } => {
            let appdata = AppData::new(registry.root())?;
            println!("session_dir\t{}", appdata.session_dir(&prefix)?.display());
            println!("db_file\t{}", appdata.db_file(&prefix)?.display());
            Ok(0)
        }
    }
}

fn login(registry: &Registry, api: &MastodonClient, args: &LoginArgs) -> anyhow::Result<i32> {
    let flow =
        LoginFlow::new(registry, api, &args.client_name, &args.app.prefix, &args.app.app_secret);

    let instance = match &args.instance {
        Some(instance) => instance.clone(),
        None => prompt("Enter mastodon instance name: ")?,
    };

    let client = flow.ensure_client(&instance)?;
    println!("{}", flow.authorize_url(&client)?);

    let code = prompt("After logging in, enter the code you received: ")?;
    let outcome = flow.complete(&instance, &client, &code)?;
    println!("logged in as {}\t{}", outcome.acct, outcome.path.display());
    Ok(0)
}

fn prompt(message: &str) -> anyhow::Result<String> {
    let mut stderr = std::io::stderr();
    stderr.write_all(message.as_bytes())?;
    stderr.flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let line = line.trim();
    if line.is_empty() {
        anyhow::bail!("no input");
    }
    Ok(line.to_owned())
}

fn print_outcome(path: &std::path::Path, outcome: &RevokeOutcome) {
    match outcome {
        RevokeOutcome::Revoked => println!("revoked\t{}", path.display()),
        RevokeOutcome::RemoteFailed { error } => {
            println!("deleted\t{}\t(remote: {error})", path.display())
        }
        RevokeOutcome::LocalFailed { error, .. } => {
            println!("failed\t{}\t{error}", path.display())
        }
    }
}
