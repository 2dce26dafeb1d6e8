// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-band OAuth login that leaves a user credential in the registry.
//!
//! 1. [`LoginFlow::ensure_client`] registers the app with the instance unless
//!    a client credential already exists.
//! 2. The user opens [`LoginFlow::authorize_url`] and pastes back the code.
//! 3. [`LoginFlow::complete`] exchanges the code into a credential stored
//!    under a temporary identity keyed by the code, looks up the account
//!    name, and moves the credential to its final identity.

use std::path::{Path, PathBuf};

use crate::identity::CredentialKind;
use crate::mastodon::payload;
use crate::mastodon::{ClientCredential, OAuthApi, StoredCredential};
use crate::registry::Registry;

/// Where a completed login stored its credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub path: PathBuf,
    pub acct: String,
}

pub struct LoginFlow<'a, A: OAuthApi> {
    registry: &'a Registry,
    api: &'a A,
    client_name: String,
    prefix: String,
    app_secret: String,
}

impl<'a, A: OAuthApi> LoginFlow<'a, A> {
    pub fn new(
        registry: &'a Registry,
        api: &'a A,
        client_name: impl Into<String>,
        prefix: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            api,
            client_name: client_name.into(),
            prefix: prefix.into(),
            app_secret: app_secret.into(),
        }
    }

    /// Path of the app's client credential for `instance`, registering the
    /// app first if the credential does not exist yet.
    pub fn ensure_client(&self, instance: &str) -> anyhow::Result<PathBuf> {
        self.registry.with_lock(|reg| -> anyhow::Result<PathBuf> {
            let path =
                reg.resolve_name(&self.prefix, &self.app_secret, instance, &CredentialKind::Client)?;
            if !reg.exists(&path)? {
                let client = self.api.register_app(instance, &self.client_name)?;
                payload::write(&path, &StoredCredential::Client(client))?;
                reg.touch(&path)?;
                tracing::info!(instance, path = %path.display(), "registered client credential");
            }
            Ok(path)
        })
    }

    pub fn authorize_url(&self, client_path: &Path) -> anyhow::Result<String> {
        let client = self.read_client(client_path)?;
        self.api.authorize_url(&client)
    }

    /// Exchange an authorization code and store the resulting user credential.
    ///
    /// An existing credential for the same account is replaced.
    pub fn complete(
        &self,
        instance: &str,
        client_path: &Path,
        code: &str,
    ) -> anyhow::Result<LoginOutcome> {
        let client = self.read_client(client_path)?;

        self.registry.with_lock(|reg| -> anyhow::Result<LoginOutcome> {
            let pending = reg.resolve_name(
                &self.prefix,
                &self.app_secret,
                instance,
                &CredentialKind::user(code),
            )?;
            let user = self.api.exchange_code(&client, code)?;
            payload::write(&pending, &StoredCredential::User(user.clone()))?;
            reg.touch(&pending)?;

            let acct = match self.api.verify_credentials(&user) {
                Ok(acct) => acct,
                Err(e) => {
                    let outcome = reg.revoke(&pending)?;
                    tracing::warn!(err = %e, outcome = ?outcome, "verification failed, discarded new token");
                    return Err(e);
                }
            };

            let path = reg.resolve_name(
                &self.prefix,
                &self.app_secret,
                instance,
                &CredentialKind::user(acct.as_str()),
            )?;
            reg.move_credential(&pending, &path)?;
            tracing::info!(instance, acct = %acct, path = %path.display(), "user logged in");
            Ok(LoginOutcome { path, acct })
        })
    }

    fn read_client(&self, client_path: &Path) -> anyhow::Result<ClientCredential> {
        self.registry.check_path(client_path)?;
        match payload::read(client_path)? {
            StoredCredential::Client(client) => Ok(client),
            StoredCredential::User(_) => {
                anyhow::bail!("{} holds a user credential, not a client", client_path.display())
            }
        }
    }
}

#[cfg(test)]
#[path = "login_tests.rs"]
mod tests;
