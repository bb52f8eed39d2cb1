//! In-memory backend for testing.
//!
//! Nothing is persisted and secrets are kept in plain memory. Do not use
//! outside tests and demos.

#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{AccountBackend, PreferenceStore};
use crate::Result;
use crate::credentials::{CredentialResult, CredentialVault};

#[derive(Debug, Default)]
struct State {
    /// `(account_type, name)` in creation order.
    accounts: Vec<(String, String)>,
    /// `(name, key) -> value`.
    metadata: HashMap<(String, String), String>,
    preferences: HashMap<String, String>,
    passwords: HashMap<String, String>,
    /// `(name, token_type) -> token`.
    tokens: HashMap<(String, String), String>,
}

/// Backend keeping accounts, metadata, preferences and secrets in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove an account record and everything attached to it.
    ///
    /// Simulates deletion by an external actor; the store itself never
    /// deletes accounts.
    pub fn remove_account(&self, name: &str) {
        let mut state = self.state();
        state.accounts.retain(|(_, n)| n != name);
        state.metadata.retain(|(n, _), _| n != name);
        state.passwords.remove(name);
        state.tokens.retain(|(n, _), _| n != name);
    }

    /// Number of metadata values stored for `name`.
    #[must_use]
    pub fn metadata_count(&self, name: &str) -> usize {
        self.state()
            .metadata
            .keys()
            .filter(|(n, _)| n == name)
            .count()
    }
}

impl AccountBackend for MemoryBackend {
    async fn list_accounts(&self, account_type: &str) -> Result<Vec<String>> {
        Ok(self
            .state()
            .accounts
            .iter()
            .filter(|(t, _)| t == account_type)
            .map(|(_, n)| n.clone())
            .collect())
    }

    async fn create_account(&self, account_type: &str, name: &str) -> Result<bool> {
        let mut state = self.state();
        if state.accounts.iter().any(|(_, n)| n == name) {
            return Ok(false);
        }
        state
            .accounts
            .push((account_type.to_string(), name.to_string()));
        Ok(true)
    }

    async fn delete_account(&self, name: &str) -> Result<()> {
        let mut state = self.state();
        state.accounts.retain(|(_, n)| n != name);
        state.metadata.retain(|(n, _), _| n != name);
        Ok(())
    }

    async fn metadata(&self, name: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .state()
            .metadata
            .get(&(name.to_string(), key.to_string()))
            .cloned())
    }

    async fn set_metadata(&self, name: &str, key: &str, value: &str) -> Result<()> {
        self.state()
            .metadata
            .insert((name.to_string(), key.to_string()), value.to_string());
        Ok(())
    }
}

impl PreferenceStore for MemoryBackend {
    async fn string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state().preferences.get(key).cloned())
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.state()
            .preferences
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.state().preferences.remove(key);
        Ok(())
    }
}

impl CredentialVault for MemoryBackend {
    fn store_password(&self, account: &str, password: &str) -> CredentialResult<()> {
        self.state()
            .passwords
            .insert(account.to_string(), password.to_string());
        Ok(())
    }

    fn password(&self, account: &str) -> CredentialResult<Option<String>> {
        Ok(self.state().passwords.get(account).cloned())
    }

    fn set_auth_token(
        &self,
        account: &str,
        token_type: &str,
        token: &str,
    ) -> CredentialResult<()> {
        self.state().tokens.insert(
            (account.to_string(), token_type.to_string()),
            token.to_string(),
        );
        Ok(())
    }

    fn auth_token(&self, account: &str, token_type: &str) -> CredentialResult<Option<String>> {
        Ok(self
            .state()
            .tokens
            .get(&(account.to_string(), token_type.to_string()))
            .cloned())
    }
}
