// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote revocation seam and revocation results.

use std::path::{Path, PathBuf};

/// Invalidates the token stored in a credential payload at the remote service.
///
/// Called before the registry deletes the payload. Failures are reported,
/// never fatal: local deletion happens regardless.
pub trait Revoker: Send + Sync {
    fn revoke_remote(&self, payload: &Path) -> anyhow::Result<()>;
}

/// Revoker that never contacts a remote service.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRevoker;

impl Revoker for NoopRevoker {
    fn revoke_remote(&self, _payload: &Path) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Result of revoking a single credential pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// Remote invalidation succeeded and both files are gone.
    Revoked,
    /// Remote invalidation failed; local files were still removed.
    RemoteFailed { error: String },
    /// One or both local files could not be removed. `remote_error` is set
    /// when remote invalidation failed too.
    LocalFailed { error: String, remote_error: Option<String> },
}

impl RevokeOutcome {
    /// Whether no local secret material is left behind.
    pub fn is_deleted(&self) -> bool {
        !matches!(self, Self::LocalFailed { .. })
    }
}

/// Aggregated result of a sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RevocationReport {
    pub revoked: Vec<PathBuf>,
    pub remote_failed: Vec<(PathBuf, String)>,
    pub local_failed: Vec<(PathBuf, String)>,
    /// Credentials examined but newer than the cutoff.
    pub kept: Vec<PathBuf>,
}

impl RevocationReport {
    pub fn record(&mut self, path: PathBuf, outcome: RevokeOutcome) {
        match outcome {
            RevokeOutcome::Revoked => self.revoked.push(path),
            RevokeOutcome::RemoteFailed { error } => self.remote_failed.push((path, error)),
            RevokeOutcome::LocalFailed { error, .. } => self.local_failed.push((path, error)),
        }
    }

    /// Number of credentials whose local files were removed.
    pub fn deleted_count(&self) -> usize {
        self.revoked.len() + self.remote_failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.remote_failed.is_empty() && self.local_failed.is_empty()
    }
}
