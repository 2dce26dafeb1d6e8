// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-app data that lives next to the credential store: web session
//! directories and single-file databases.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::identity::validate_prefix;

pub const APPDATA_DIR: &str = "appdata";

#[derive(Debug, Clone)]
pub struct AppData {
    dir: PathBuf,
}

impl AppData {
    /// App data directory under the registry root, created if missing.
    pub fn new(registry_root: &Path) -> Result<Self> {
        let dir = registry_root.join(APPDATA_DIR);
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Session storage directory for an app, created if missing.
    pub fn session_dir(&self, prefix: &str) -> Result<PathBuf> {
        validate_prefix(prefix)?;
        let dir = self.dir.join(format!("session_{prefix}"));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Database file for an app. Not created.
    pub fn db_file(&self, prefix: &str) -> Result<PathBuf> {
        validate_prefix(prefix)?;
        Ok(self.dir.join(format!("db_{prefix}.db")))
    }
}

#[cfg(test)]
#[path = "appdata_tests.rs"]
mod tests;
