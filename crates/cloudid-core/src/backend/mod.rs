//! Persistence backends.
//!
//! The account store talks to storage only through the capability traits in
//! this module, so any backend providing them is substitutable:
//! - [`SqliteBackend`]: accounts, metadata and preferences in `SQLite`
//! - [`MemoryBackend`]: everything in process memory, for tests
//!
//! Secrets go through [`crate::credentials::CredentialVault`] instead.

mod memory;
mod sqlite;

use std::future::Future;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use crate::Result;

/// Account records and their key/value metadata.
pub trait AccountBackend: Send + Sync {
    /// Names of all accounts of `account_type`, in creation order.
    fn list_accounts(&self, account_type: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Insert an account record if no record with `name` exists.
    ///
    /// Names are unique across all account types, since metadata and vault
    /// entries are keyed by name alone. Returns `false` when the name was
    /// already taken, under any type.
    fn create_account(
        &self,
        account_type: &str,
        name: &str,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Delete an account record and its metadata. Deleting a missing account
    /// is not an error.
    fn delete_account(&self, name: &str) -> impl Future<Output = Result<()>> + Send;

    /// Read one metadata value.
    fn metadata(&self, name: &str, key: &str)
    -> impl Future<Output = Result<Option<String>>> + Send;

    /// Write one metadata value, overwriting any previous value.
    fn set_metadata(
        &self,
        name: &str,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Application-wide string preferences.
pub trait PreferenceStore: Send + Sync {
    /// Read a preference.
    fn string(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Write a preference.
    fn set_string(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;

    /// Remove a preference. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}
