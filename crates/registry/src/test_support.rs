// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: isolated registries, fake revokers, and
//! assertion helpers.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::registry::Registry;
use crate::revoke::Revoker;

pub const TEST_GLOBAL_SECRET: &str = "test-global-secret";
pub const TEST_APP_SECRET: &str = "test-app-secret";

/// A registry in a fresh temp directory. Keep the `TempDir` alive for the
/// duration of the test.
pub fn temp_registry(
    revoker: Arc<dyn Revoker>,
) -> anyhow::Result<(tempfile::TempDir, Registry)> {
    let dir = tempfile::tempdir()?;
    let registry = Registry::open(dir.path().join("secrets"), TEST_GLOBAL_SECRET, revoker)?;
    Ok((dir, registry))
}

/// Write a payload file and stamp its metadata.
pub fn plant(registry: &Registry, path: &Path, contents: &str) -> anyhow::Result<()> {
    std::fs::write(path, contents)?;
    registry.touch(path)?;
    Ok(())
}

/// Revoker that records every call and optionally fails.
#[derive(Debug, Default)]
pub struct RecordingRevoker {
    calls: Mutex<Vec<PathBuf>>,
    fail: bool,
}

impl RecordingRevoker {
    pub fn failing() -> Self {
        Self { calls: Mutex::new(Vec::new()), fail: true }
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Revoker for RecordingRevoker {
    fn revoke_remote(&self, payload: &Path) -> anyhow::Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(payload.to_owned());
        }
        if self.fail {
            anyhow::bail!("remote unreachable");
        }
        Ok(())
    }
}

/// Assert that `$expr` is an `Err` whose Display contains `$substr`.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
