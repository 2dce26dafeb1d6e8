// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory lock over the whole credential store.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use nix::fcntl::{Flock, FlockArg};

use crate::error::{RegistryError, Result};

/// File name of the lock file inside the registry root.
pub const LOCK_FILE: &str = ".lock";

/// Held exclusive `flock(2)` on the registry lock file.
///
/// Each acquisition opens its own file description, so two guards never
/// coexist, whether they live in different processes or different threads.
/// Acquiring a second guard on a thread that already holds one deadlocks.
/// Released on [`RegistryLock::unlock`] or drop.
pub struct RegistryLock {
    inner: Flock<File>,
    path: PathBuf,
}

impl std::fmt::Debug for RegistryLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryLock").field("path", &self.path).finish_non_exhaustive()
    }
}

impl RegistryLock {
    /// Block until the exclusive lock on `path` is held.
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).truncate(false).write(true).open(path)?;
        let inner = Flock::lock(file, FlockArg::LockExclusive)
            .map_err(|(_file, errno)| RegistryError::Lock(errno))?;
        tracing::trace!(path = %path.display(), "registry lock acquired");
        Ok(Self { inner, path: path.to_owned() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock explicitly, surfacing any error from `flock(2)`.
    pub fn unlock(self) -> Result<()> {
        let Self { inner, path } = self;
        inner.unlock().map_err(|(_guard, errno)| RegistryError::Lock(errno))?;
        tracing::trace!(path = %path.display(), "registry lock released");
        Ok(())
    }
}
