//! Secure credential storage.
//!
//! Passwords and auth tokens never go into the metadata store. They are kept
//! in a [`CredentialVault`]; [`KeyringVault`] uses the platform's native
//! credential storage:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use keyring::Entry;
use tracing::debug;

/// Default service name used for keyring entries.
pub const SERVICE_NAME: &str = "cloudid";

/// Credential type identifier for account passwords.
const PASSWORD_CREDENTIAL: &str = "password";

/// Prefix for auth token credential types.
const TOKEN_CREDENTIAL_PREFIX: &str = "token";

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Failed to access keyring.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Secret storage for account passwords and auth tokens.
///
/// Accounts are addressed by their registered name. Auth tokens are stored
/// per token type, so one account may hold several.
pub trait CredentialVault: Send + Sync {
    /// Stores the password for an account, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn store_password(&self, account: &str, password: &str) -> CredentialResult<()>;

    /// Retrieves the password for an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn password(&self, account: &str) -> CredentialResult<Option<String>>;

    /// Stores an auth token of `token_type` for an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn set_auth_token(&self, account: &str, token_type: &str, token: &str)
    -> CredentialResult<()>;

    /// Retrieves the auth token of `token_type` for an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn auth_token(&self, account: &str, token_type: &str) -> CredentialResult<Option<String>>;
}

/// Vault backed by the system keyring.
#[derive(Debug, Clone)]
pub struct KeyringVault {
    service: String,
}

impl KeyringVault {
    /// Create a vault using the default service name.
    #[must_use]
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Create a vault under a custom keyring service name.
    #[must_use]
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Generates the keyring entry key for a credential.
    fn credential_key(&self, account: &str, credential_type: &str) -> String {
        format!("{}_{credential_type}_{account}", self.service)
    }

    fn entry(&self, account: &str, credential_type: &str) -> CredentialResult<Entry> {
        let key = self.credential_key(account, credential_type);
        Ok(Entry::new(&self.service, &key)?)
    }

    fn read(&self, account: &str, credential_type: &str) -> CredentialResult<Option<String>> {
        match self.entry(account, credential_type)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => {
                debug!("No {credential_type} credential found for account {account}");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for KeyringVault {
    fn default() -> Self {
        Self::new()
    }
}

fn token_credential(token_type: &str) -> String {
    format!("{TOKEN_CREDENTIAL_PREFIX}:{token_type}")
}

impl CredentialVault for KeyringVault {
    fn store_password(&self, account: &str, password: &str) -> CredentialResult<()> {
        self.entry(account, PASSWORD_CREDENTIAL)?
            .set_password(password)?;
        debug!("Stored password for account {account}");
        Ok(())
    }

    fn password(&self, account: &str) -> CredentialResult<Option<String>> {
        self.read(account, PASSWORD_CREDENTIAL)
    }

    fn set_auth_token(
        &self,
        account: &str,
        token_type: &str,
        token: &str,
    ) -> CredentialResult<()> {
        self.entry(account, &token_credential(token_type))?
            .set_password(token)?;
        debug!("Stored {token_type} token for account {account}");
        Ok(())
    }

    fn auth_token(&self, account: &str, token_type: &str) -> CredentialResult<Option<String>> {
        self.read(account, &token_credential(token_type))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    // Tests touching the real keyring are ignored by default to avoid
    // polluting it. Run manually with `cargo test -- --ignored`

    use super::*;

    #[test]
    fn credential_key_layout() {
        let vault = KeyringVault::with_service("test");
        assert_eq!(
            vault.credential_key("alice@cloud.example.com", PASSWORD_CREDENTIAL),
            "test_password_alice@cloud.example.com"
        );
        assert_eq!(
            vault.credential_key("alice@cloud.example.com", &token_credential("bearer")),
            "test_token:bearer_alice@cloud.example.com"
        );
    }

    #[test]
    #[ignore = "Interacts with system keyring"]
    fn test_store_and_retrieve_password() {
        let vault = KeyringVault::with_service("cloudid-test");
        let account = "keyring-test@cloud.example.com";

        vault.store_password(account, "test_password_12345").unwrap();
        assert_eq!(
            vault.password(account).unwrap(),
            Some("test_password_12345".to_string())
        );
    }

    #[test]
    #[ignore = "Interacts with system keyring"]
    fn test_store_and_retrieve_token() {
        let vault = KeyringVault::with_service("cloudid-test");
        let account = "keyring-test@cloud.example.com";

        vault.set_auth_token(account, "bearer", "tok").unwrap();
        assert_eq!(
            vault.auth_token(account, "bearer").unwrap(),
            Some("tok".to_string())
        );
        assert_eq!(vault.auth_token(account, "other").unwrap(), None);
    }
}
