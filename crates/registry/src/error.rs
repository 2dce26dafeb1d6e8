// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by registry operations.
///
/// Per-credential revocation failures are not errors; they are reported
/// through [`crate::revoke::RevokeOutcome`].
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Identity components are malformed or contradict each other.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Path is outside the registry root or is not a credential payload.
    #[error("invalid credential path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// The process-wide global secret is unset or blank.
    #[error("global secret must be set and non-blank")]
    MissingGlobalSecret,

    #[error("flock failed: {0}")]
    Lock(nix::errno::Errno),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    pub(crate) fn identity(msg: impl Into<String>) -> Self {
        Self::InvalidIdentity(msg.into())
    }

    /// Stable machine-readable code, used in CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidIdentity(_) => "INVALID_IDENTITY",
            Self::InvalidPath(_) => "INVALID_PATH",
            Self::MissingGlobalSecret => "MISSING_GLOBAL_SECRET",
            Self::Lock(_) => "LOCK",
            Self::Io(_) => "IO",
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
