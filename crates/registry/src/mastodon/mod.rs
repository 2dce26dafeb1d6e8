// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocking client for the Mastodon OAuth endpoints the registry relies on:
//! app registration, code exchange, account verification, and revocation.

pub mod payload;

use std::path::Path;
use std::sync::Once;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::revoke::Revoker;

/// Scopes requested by default for both app registration and login.
pub const DEFAULT_SCOPES: &[&str] = &["read", "write", "follow", "push"];

/// Out-of-band redirect: the server shows the code for the user to paste.
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Registered application credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredential {
    pub client_id: String,
    pub client_secret: String,
    pub api_base_url: String,
}

/// User access token plus the client it was issued to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredential {
    pub access_token: String,
    pub client_id: String,
    pub client_secret: String,
    pub api_base_url: String,
}

/// Contents of a credential payload file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoredCredential {
    Client(ClientCredential),
    User(UserCredential),
}

#[derive(Debug, Deserialize)]
struct AppResponse {
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    acct: String,
}

/// The OAuth operations a login flow needs from the remote service.
pub trait OAuthApi {
    fn register_app(&self, instance: &str, client_name: &str) -> anyhow::Result<ClientCredential>;

    fn authorize_url(&self, client: &ClientCredential) -> anyhow::Result<String>;

    fn exchange_code(&self, client: &ClientCredential, code: &str)
        -> anyhow::Result<UserCredential>;

    /// Account name (`acct`) the token belongs to.
    fn verify_credentials(&self, user: &UserCredential) -> anyhow::Result<String>;
}

/// Install the rustls crypto provider (needed for reqwest even on plain HTTP).
pub fn ensure_crypto_provider() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Base URL for an instance given with or without a scheme.
pub fn api_base_url(instance: &str) -> String {
    let instance = instance.trim().trim_end_matches('/');
    if instance.starts_with("http://") || instance.starts_with("https://") {
        instance.to_owned()
    } else {
        format!("https://{instance}")
    }
}

pub struct MastodonClient {
    http: reqwest::blocking::Client,
    scopes: String,
    redirect_uri: String,
}

impl MastodonClient {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_scopes(DEFAULT_SCOPES)
    }

    pub fn with_scopes(scopes: &[&str]) -> anyhow::Result<Self> {
        ensure_crypto_provider();
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("secret-registry/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, scopes: scopes.join(" "), redirect_uri: OOB_REDIRECT_URI.to_owned() })
    }

    pub fn scopes(&self) -> &str {
        &self.scopes
    }

    /// Invalidate a user access token.
    pub fn revoke_token(&self, user: &UserCredential) -> anyhow::Result<()> {
        let url = format!("{}/oauth/revoke", user.api_base_url);
        let resp = self
            .http
            .post(&url)
            .form(&[
                ("client_id", user.client_id.as_str()),
                ("client_secret", user.client_secret.as_str()),
                ("token", user.access_token.as_str()),
            ])
            .send()?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            anyhow::bail!("token revocation failed ({status}): {text}");
        }
        Ok(())
    }
}

impl OAuthApi for MastodonClient {
    fn register_app(&self, instance: &str, client_name: &str) -> anyhow::Result<ClientCredential> {
        let base = api_base_url(instance);
        let resp = self
            .http
            .post(format!("{base}/api/v1/apps"))
            .form(&[
                ("client_name", client_name),
                ("redirect_uris", self.redirect_uri.as_str()),
                ("scopes", self.scopes.as_str()),
            ])
            .send()?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            anyhow::bail!("app registration failed ({status}): {text}");
        }

        let app: AppResponse = resp.json()?;
        Ok(ClientCredential {
            client_id: app.client_id,
            client_secret: app.client_secret,
            api_base_url: base,
        })
    }

    fn authorize_url(&self, client: &ClientCredential) -> anyhow::Result<String> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/oauth/authorize", client.api_base_url),
            &[
                ("client_id", client.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", self.scopes.as_str()),
            ],
        )?;
        Ok(url.into())
    }

    fn exchange_code(
        &self,
        client: &ClientCredential,
        code: &str,
    ) -> anyhow::Result<UserCredential> {
        let resp = self
            .http
            .post(format!("{}/oauth/token", client.api_base_url))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", self.scopes.as_str()),
            ])
            .send()?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            anyhow::bail!("token exchange failed ({status}): {text}");
        }

        let token: TokenResponse = resp.json()?;
        Ok(UserCredential {
            access_token: token.access_token,
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            api_base_url: client.api_base_url.clone(),
        })
    }

    fn verify_credentials(&self, user: &UserCredential) -> anyhow::Result<String> {
        let resp = self
            .http
            .get(format!("{}/api/v1/accounts/verify_credentials", user.api_base_url))
            .bearer_auth(&user.access_token)
            .send()?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            anyhow::bail!("credential verification failed ({status}): {text}");
        }

        let account: AccountResponse = resp.json()?;
        Ok(account.acct)
    }
}

impl Revoker for MastodonClient {
    /// Client payloads hold no access token, so there is nothing to revoke.
    fn revoke_remote(&self, payload: &Path) -> anyhow::Result<()> {
        match payload::read(payload)? {
            StoredCredential::User(user) => self.revoke_token(&user),
            StoredCredential::Client(_) => {
                tracing::debug!(path = %payload.display(), "client credential, no remote token");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
