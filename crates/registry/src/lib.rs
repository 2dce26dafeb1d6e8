// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret registry: file-backed OAuth credential store for Mastodon apps.
//!
//! Credentials live as content-addressed files whose names are a keyed hash
//! of the identity they belong to, guarded by one advisory lock over the
//! whole store.

pub mod appdata;
pub mod config;
pub mod error;
pub mod identity;
pub mod lock;
pub mod login;
pub mod mastodon;
pub mod registry;
pub mod revoke;
pub mod test_support;

pub use error::{RegistryError, Result};
pub use identity::{CredentialKind, CredentialType};
pub use lock::RegistryLock;
pub use registry::Registry;
pub use revoke::{NoopRevoker, RevocationReport, RevokeOutcome, Revoker};
