// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential payload files: JSON, written atomically with owner-only
//! permissions.

use std::io::Write;
use std::path::Path;

use anyhow::Context;

use crate::mastodon::StoredCredential;

pub fn read(path: &Path) -> anyhow::Result<StoredCredential> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading credential {}", path.display()))?;
    let cred = serde_json::from_str(&contents)
        .with_context(|| format!("parsing credential {}", path.display()))?;
    Ok(cred)
}

/// Write a payload (temp file in the same directory + rename).
///
/// Temp files are created 0600 and never match the payload naming scheme,
/// so sweeps ignore a write that dies halfway.
pub fn write(path: &Path, cred: &StoredCredential) -> anyhow::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("credential path has no parent: {}", path.display()))?;
    let json = serde_json::to_string_pretty(cred)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}
