//! # cloudid-core
//!
//! Local identity store for accounts on remote cloud servers.
//!
//! This crate provides:
//! - Account identity matching (`username@host[:port]`, case-insensitive user)
//! - Provisioning of password ("basic") and `OAuth2` accounts
//! - Default account selection backed by a preference store
//! - Per-account metadata queries
//! - `SQLite`, keyring and in-memory storage backends
//! - A single-flight use-case runner publishing UI events

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod backend;
pub mod config;
mod error;
pub mod usecase;

pub use account::credentials;
pub use account::{
    AccountInfo, AccountName, AccountStore, CredentialKind, OAuthGrant, ServerInfo, UserInfo,
    find_equivalent,
};
pub use account::{CredentialError, CredentialResult, CredentialVault, KeyringVault};
pub use backend::{AccountBackend, MemoryBackend, PreferenceStore, SqliteBackend};
pub use config::StoreConfig;
pub use error::{Error, Result};
pub use usecase::{Event, RunOptions, UiResult, UseCaseRunner};
