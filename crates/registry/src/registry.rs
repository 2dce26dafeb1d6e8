// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed credential registry.
//!
//! Every credential is a pair of sibling files in the registry root: the
//! payload `{prefix}_{kind}_{hex}.secret` and its metadata
//! `{prefix}_{kind}_{hex}.secret_meta.secret`, which holds the last-update
//! time as fractional seconds since the Unix epoch. Multi-step mutations
//! must run under [`Registry::lock`].

use std::ffi::{OsStr, OsString};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{RegistryError, Result};
use crate::identity::{validate_prefix, CredentialKind, CredentialType, Identity};
use crate::lock::{RegistryLock, LOCK_FILE};
use crate::revoke::{RevocationReport, RevokeOutcome, Revoker};

pub const PAYLOAD_SUFFIX: &str = ".secret";
pub const META_SUFFIX: &str = "_meta.secret";

/// Length of a lowercase hex SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// Credential store rooted at one directory and keyed by one global secret.
pub struct Registry {
    root: PathBuf,
    global_secret: String,
    revoker: Arc<dyn Revoker>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("root", &self.root).finish_non_exhaustive()
    }
}

impl Registry {
    /// Open (creating if needed) the registry at `root`.
    ///
    /// The root is canonicalized so path checks compare like with like.
    pub fn open(
        root: impl AsRef<Path>,
        global_secret: impl Into<String>,
        revoker: Arc<dyn Revoker>,
    ) -> Result<Self> {
        let global_secret = global_secret.into();
        if global_secret.trim().is_empty() {
            return Err(RegistryError::MissingGlobalSecret);
        }

        std::fs::create_dir_all(root.as_ref())?;
        let root = std::fs::canonicalize(root.as_ref())?;

        let lock_path = root.join(LOCK_FILE);
        if !lock_path.exists() {
            std::fs::write(&lock_path, b"")?;
        }

        tracing::debug!(root = %root.display(), "registry opened");
        Ok(Self { root, global_secret, revoker })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic payload path for an identity. Pure; needs no lock.
    pub fn resolve_name(
        &self,
        prefix: &str,
        app_secret: &str,
        instance: &str,
        kind: &CredentialKind,
    ) -> Result<PathBuf> {
        let identity = Identity::new(prefix, instance, kind)?;
        let stem = identity.file_stem(&self.global_secret, app_secret)?;
        tracing::debug!(
            prefix,
            kind = %kind.credential_type(),
            instance = identity.instance,
            "resolved credential name"
        );
        Ok(self.root.join(format!("{stem}{PAYLOAD_SUFFIX}")))
    }

    /// Block until the store-wide lock is held.
    pub fn lock(&self) -> Result<RegistryLock> {
        RegistryLock::acquire(&self.root.join(LOCK_FILE))
    }

    /// Run `f` with the store-wide lock held. The lock is released on both
    /// success and failure. An error from `f` wins over an unlock error.
    pub fn with_lock<T, E>(
        &self,
        f: impl FnOnce(&Self) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<RegistryError>,
    {
        let guard = self.lock()?;
        let result = f(self);
        let unlocked = guard.unlock();
        let value = result?;
        unlocked?;
        Ok(value)
    }

    /// Reject anything that is not a payload file directly inside the root.
    pub fn check_path(&self, path: &Path) -> Result<()> {
        self.resolve_path(path).map(|_| ())
    }

    /// The payload path as seen from the canonical root.
    ///
    /// Relative paths and paths through a symlinked root are accepted as long
    /// as their parent directory resolves to the root.
    fn resolve_path(&self, path: &Path) -> Result<PathBuf> {
        let invalid = || RegistryError::InvalidPath(path.to_owned());

        let name = path
            .file_name()
            .filter(|name| name.to_str().is_some_and(is_payload_file_name))
            .ok_or_else(invalid)?;
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let parent = std::fs::canonicalize(parent).map_err(|_| invalid())?;
        if parent != self.root {
            return Err(invalid());
        }
        Ok(parent.join(name))
    }

    pub fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.resolve_path(path)?.is_file())
    }

    /// Relocate a credential pair, e.g. from a temporary identity to its final one.
    ///
    /// Both files of `from` must exist; otherwise nothing is touched. An
    /// existing pair at `to` is replaced. The payload moves first; if the
    /// metadata rename then fails, the payload is moved back (best effort)
    /// and the error is returned. In that case a pair previously stored at
    /// `to` has already lost its payload.
    pub fn move_credential(&self, from: &Path, to: &Path) -> Result<()> {
        let from = self.resolve_path(from)?;
        let to = self.resolve_path(to)?;

        std::fs::metadata(&from)?;
        std::fs::metadata(meta_path(&from))?;

        std::fs::rename(&from, &to)?;
        if let Err(e) = std::fs::rename(meta_path(&from), meta_path(&to)) {
            if let Err(rollback) = std::fs::rename(&to, &from) {
                tracing::warn!(
                    from = %from.display(),
                    to = %to.display(),
                    err = %rollback,
                    "payload rollback failed, credential pair is split"
                );
            }
            return Err(e.into());
        }

        tracing::info!(from = %from.display(), to = %to.display(), "credential moved");
        Ok(())
    }

    /// Stamp the credential's metadata with the current time.
    pub fn touch(&self, path: &Path) -> Result<()> {
        let path = self.resolve_path(path)?;
        let now = epoch_secs_f64(SystemTime::now());
        std::fs::write(meta_path(&path), now.to_string())?;
        Ok(())
    }

    /// Last-update time in epoch seconds; 0 when missing or unreadable.
    pub fn meta_time(&self, path: &Path) -> Result<f64> {
        let path = self.resolve_path(path)?;
        Ok(read_meta_time(&meta_path(&path)))
    }

    /// Invalidate the credential remotely (best effort), then delete the pair.
    ///
    /// Only an invalid path is an error; everything else is in the outcome.
    pub fn revoke(&self, path: &Path) -> Result<RevokeOutcome> {
        let path = self.resolve_path(path)?;
        let path = path.as_path();

        let remote_error = match self.revoker.revoke_remote(path) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), err = %e, "could not revoke token remotely");
                Some(format!("{e:#}"))
            }
        };

        let local_errors: Vec<String> = [path.to_owned(), meta_path(path)]
            .iter()
            .filter_map(|p| match std::fs::remove_file(p) {
                Ok(()) => None,
                Err(e) if e.kind() == ErrorKind::NotFound => None,
                Err(e) => Some(format!("{}: {e}", p.display())),
            })
            .collect();

        let outcome = match (local_errors.is_empty(), remote_error) {
            (true, None) => RevokeOutcome::Revoked,
            (true, Some(error)) => RevokeOutcome::RemoteFailed { error },
            (false, remote_error) => {
                let error = local_errors.join("; ");
                tracing::warn!(path = %path.display(), err = %error, "error while deleting credential");
                RevokeOutcome::LocalFailed { error, remote_error }
            }
        };

        tracing::info!(path = %path.display(), outcome = ?outcome, "credential revoked");
        Ok(outcome)
    }

    /// Payload paths stored for `prefix` and `ty`, sorted.
    pub fn list(&self, prefix: &str, ty: CredentialType) -> Result<Vec<PathBuf>> {
        validate_prefix(prefix)?;
        let head = format!("{prefix}_{ty}_");

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            if is_payload_name(&name, &head) && entry.file_type()?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Revoke every `prefix`/`ty` credential last updated strictly before
    /// `older_than` (default: now, i.e. everything).
    ///
    /// Callers should hold the lock for the duration of the sweep.
    pub fn revoke_expired(
        &self,
        prefix: &str,
        ty: CredentialType,
        older_than: Option<SystemTime>,
    ) -> Result<RevocationReport> {
        let cutoff = epoch_secs_f64(older_than.unwrap_or_else(SystemTime::now));
        let mut report = RevocationReport::default();

        for path in self.list(prefix, ty)? {
            let updated = read_meta_time(&meta_path(&path));
            if updated < cutoff {
                let outcome = self.revoke(&path)?;
                report.record(path, outcome);
            } else {
                report.kept.push(path);
            }
        }

        tracing::debug!(
            prefix,
            kind = %ty,
            revoked = report.revoked.len(),
            remote_failed = report.remote_failed.len(),
            local_failed = report.local_failed.len(),
            kept = report.kept.len(),
            "expiry sweep finished"
        );
        Ok(report)
    }
}

/// Metadata sibling of a payload path.
pub fn meta_path(payload: &Path) -> PathBuf {
    let mut name = OsString::from(payload.as_os_str());
    name.push(META_SUFFIX);
    PathBuf::from(name)
}

pub fn epoch_secs_f64(t: SystemTime) -> f64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

fn read_meta_time(meta: &Path) -> f64 {
    std::fs::read_to_string(meta)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|t| t.is_finite())
        .unwrap_or(0.0)
}

fn is_payload_file_name(name: &str) -> bool {
    name.len() > PAYLOAD_SUFFIX.len() && name.ends_with(PAYLOAD_SUFFIX) && !name.ends_with(META_SUFFIX)
}

/// `{head}{64 lowercase hex}.secret`
fn is_payload_name(name: &OsStr, head: &str) -> bool {
    let Some(name) = name.to_str() else {
        return false;
    };
    let Some(digest) = name.strip_prefix(head).and_then(|rest| rest.strip_suffix(PAYLOAD_SUFFIX))
    else {
        return false;
    };
    digest.len() == DIGEST_HEX_LEN
        && digest.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
