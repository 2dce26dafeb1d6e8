// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::identity::{CredentialKind, CredentialType};

/// File-based OAuth credential registry for Mastodon apps.
#[derive(Debug, Parser)]
#[command(name = "secret-registry", version, about)]
pub struct Config {
    /// Directory holding credential files.
    #[arg(long, env = "SECRET_REGISTRY_DIR")]
    pub secrets_dir: Option<PathBuf>,

    /// Secret mixed into every credential file name.
    #[arg(long, env = "MASTODON_GLOBAL_SECRET", hide_env_values = true)]
    pub global_secret: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "SECRET_REGISTRY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (json or text).
    #[arg(long, env = "SECRET_REGISTRY_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in interactively and store a user credential.
    Login(LoginArgs),
    /// Print the credential path for an identity.
    Resolve(ResolveArgs),
    /// Exit 0 if the credential exists, 1 otherwise.
    Exists { path: PathBuf },
    /// Stamp a credential's metadata with the current time.
    Touch { path: PathBuf },
    /// Revoke a credential remotely and delete it.
    Revoke { path: PathBuf },
    /// Revoke all credentials of one app and kind older than a cutoff.
    RevokeExpired(SweepArgs),
    /// List stored credentials of one app and kind.
    List(ListArgs),
    /// Print the session directory and database file for an app.
    Appdata {
        #[arg(long)]
        prefix: String,
    },
}

#[derive(Debug, Args)]
pub struct AppArgs {
    /// Credential prefix of the owning app.
    #[arg(long)]
    pub prefix: String,

    /// Per-app secret mixed into credential file names.
    #[arg(long, env = "SECRET_REGISTRY_APP_SECRET", hide_env_values = true)]
    pub app_secret: String,
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    #[command(flatten)]
    pub app: AppArgs,

    /// Application name shown to users on the instance.
    #[arg(long, default_value = "secret-registry")]
    pub client_name: String,

    /// Instance to log in to. Prompted for when omitted.
    #[arg(long)]
    pub instance: Option<String>,

    /// OAuth scopes to request.
    #[arg(long, value_delimiter = ',', default_value = "read,write,follow,push")]
    pub scopes: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub app: AppArgs,

    #[arg(long)]
    pub instance: String,

    /// Credential kind (client or user).
    #[arg(long)]
    pub kind: String,

    /// User name, required for user credentials.
    #[arg(long)]
    pub user: Option<String>,
}

impl ResolveArgs {
    pub fn credential_kind(&self) -> crate::error::Result<CredentialKind> {
        CredentialKind::from_parts(&self.kind, self.user.as_deref())
    }
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub prefix: String,

    /// Credential kind (client or user).
    #[arg(long)]
    pub kind: CredentialType,
}

#[derive(Debug, Args)]
pub struct SweepArgs {
    #[command(flatten)]
    pub list: ListArgs,

    /// Only revoke credentials not updated for this many seconds. Without
    /// it, every matching credential is revoked.
    #[arg(long)]
    pub max_age_secs: Option<u64>,
}

impl Config {
    /// Validate configuration. Returns an error message on failure.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.global_secret.as_deref() {
            Some(s) if !s.trim().is_empty() => {}
            _ => anyhow::bail!("MASTODON_GLOBAL_SECRET or --global-secret must be set"),
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        Ok(())
    }

    pub fn global_secret(&self) -> &str {
        self.global_secret.as_deref().unwrap_or_default()
    }

    pub fn secrets_dir(&self) -> PathBuf {
        self.secrets_dir.clone().unwrap_or_else(default_secrets_dir)
    }
}

/// Default credential directory.
///
/// Checks `$XDG_STATE_HOME/secret-registry`, then
/// `$HOME/.local/state/secret-registry`, then `./secrets`.
pub fn default_secrets_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("secret-registry");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/secret-registry");
    }
    PathBuf::from("secrets")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
