// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential identities and the keyed hash that names them on disk.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::error::{RegistryError, Result};

/// Reserved sequence used between hash key components. Identity components
/// must not contain it, otherwise two identities could share a key.
pub const DELIMITER: &str = "@@";

const KEY_SEPARATOR: &str = "@@@\n";

/// Credential tag as it appears in file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialType {
    Client,
    User,
}

impl CredentialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::User => "user",
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialType {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "client" => Ok(Self::Client),
            "user" => Ok(Self::User),
            other => Err(RegistryError::identity(format!(
                "kind must be client or user, got {other:?}"
            ))),
        }
    }
}

/// What a credential authenticates: the registered app, or one user of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    Client,
    User(String),
}

impl CredentialKind {
    pub fn user(name: impl Into<String>) -> Self {
        Self::User(name.into())
    }

    /// Build a kind from its string tag and optional user, rejecting
    /// combinations where user presence disagrees with the tag.
    pub fn from_parts(kind: &str, user: Option<&str>) -> Result<Self> {
        match (kind.parse::<CredentialType>()?, user) {
            (CredentialType::Client, None) => Ok(Self::Client),
            (CredentialType::Client, Some(_)) => {
                Err(RegistryError::identity("client credential must not have a user"))
            }
            (CredentialType::User, Some(u)) => Ok(Self::User(u.to_owned())),
            (CredentialType::User, None) => {
                Err(RegistryError::identity("user credential must have a user"))
            }
        }
    }

    pub fn credential_type(&self) -> CredentialType {
        match self {
            Self::Client => CredentialType::Client,
            Self::User(_) => CredentialType::User,
        }
    }

    pub fn user_name(&self) -> Option<&str> {
        match self {
            Self::Client => None,
            Self::User(u) => Some(u),
        }
    }
}

/// Strip one leading `http://` or `https://` from an instance URL.
pub fn normalize_instance(instance: &str) -> &str {
    instance
        .strip_prefix("http://")
        .or_else(|| instance.strip_prefix("https://"))
        .unwrap_or(instance)
}

/// Prefixes end up verbatim in file names.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(RegistryError::identity("prefix must not be empty"));
    }
    if !prefix.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
        return Err(RegistryError::identity(format!(
            "prefix may only contain ASCII alphanumerics, '-' and '_', got {prefix:?}"
        )));
    }
    Ok(())
}

/// Validated components of a credential identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity<'a> {
    pub prefix: &'a str,
    pub instance: &'a str,
    pub kind: &'a CredentialKind,
}

impl<'a> Identity<'a> {
    /// Validate the components and normalize the instance.
    pub fn new(prefix: &'a str, instance: &'a str, kind: &'a CredentialKind) -> Result<Self> {
        validate_prefix(prefix)?;
        let instance = normalize_instance(instance);

        if instance.contains(DELIMITER) || kind.user_name().is_some_and(|u| u.contains(DELIMITER)) {
            return Err(RegistryError::identity("no double-@ allowed in instance or user"));
        }
        if instance.is_empty() || kind.user_name().is_some_and(str::is_empty) {
            return Err(RegistryError::identity("instance and user must not be empty"));
        }

        Ok(Self { prefix, instance, kind })
    }

    /// File stem `{prefix}_{kind}_{hex}` for this identity.
    pub fn file_stem(&self, global_secret: &str, app_secret: &str) -> Result<String> {
        if app_secret.is_empty() {
            return Err(RegistryError::identity("app secret must not be empty"));
        }
        let ty = self.kind.credential_type();

        let mut key = [global_secret, app_secret, ty.as_str(), self.instance].join(KEY_SEPARATOR);
        if let Some(user) = self.kind.user_name() {
            key.push_str(KEY_SEPARATOR);
            key.push_str(user);
        }

        let digest = Sha256::digest(key.as_bytes());
        Ok(format!("{}_{}_{:x}", self.prefix, ty, digest))
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
