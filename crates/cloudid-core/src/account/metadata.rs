//! Point queries against stored account metadata.

use serde::Serialize;

use super::identity::{AccountName, find_equivalent};
use super::model::{CredentialKind, keys};
use super::store::AccountStore;
use crate::backend::{AccountBackend, PreferenceStore};
use crate::{Error, Result};

/// Snapshot of everything stored about one account, secrets excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    /// Registered account name.
    pub name: String,
    /// Server base URL.
    pub base_url: String,
    /// Server product version.
    pub server_version: Option<String>,
    /// User display name.
    pub display_name: Option<String>,
    /// How the account was provisioned.
    pub credential_kind: CredentialKind,
    /// Metadata layout version.
    pub account_version: Option<String>,
    /// `OAuth2` scope, if any.
    pub scope: Option<String>,
    /// Whether this is the selected account.
    pub is_default: bool,
}

impl<B> AccountStore<B>
where
    B: AccountBackend + PreferenceStore,
{
    /// Resolve `identity` to the registered account name.
    async fn resolve(&self, identity: &str) -> Result<String> {
        let accounts = self.accounts().await?;
        find_equivalent(&AccountName::parse(identity), &accounts)
            .map(str::to_string)
            .ok_or_else(|| Error::AccountNotFound(identity.to_string()))
    }

    async fn value(&self, identity: &str, key: &str) -> Result<Option<String>> {
        let name = self.resolve(identity).await?;
        self.backend.metadata(&name, key).await
    }

    /// Whether the account was provisioned through `OAuth2`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] if no equivalent account exists.
    pub async fn supports_oauth2(&self, identity: &str) -> Result<bool> {
        Ok(self.credential_kind(identity).await? == CredentialKind::OAuth)
    }

    /// How the account was provisioned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] if no equivalent account exists.
    pub async fn credential_kind(&self, identity: &str) -> Result<CredentialKind> {
        let stored = self.value(identity, keys::CREDENTIAL_KIND).await?;
        Ok(CredentialKind::from_stored(stored.as_deref()))
    }

    /// Server base URL the account was provisioned against.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] if no equivalent account exists, or
    /// [`Error::MissingMetadata`] if the account has no base URL recorded.
    pub async fn base_url(&self, identity: &str) -> Result<String> {
        let name = self.resolve(identity).await?;
        let value = self.backend.metadata(&name, keys::BASE_URL).await?;
        value.ok_or(Error::MissingMetadata {
            account: name,
            key: keys::BASE_URL,
        })
    }

    /// User display name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] if no equivalent account exists.
    pub async fn display_name(&self, identity: &str) -> Result<Option<String>> {
        self.value(identity, keys::DISPLAY_NAME).await
    }

    /// Server version recorded at the last provisioning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] if no equivalent account exists.
    pub async fn server_version(&self, identity: &str) -> Result<Option<String>> {
        self.value(identity, keys::SERVER_VERSION).await
    }

    /// `OAuth2` refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] if no equivalent account exists.
    pub async fn refresh_token(&self, identity: &str) -> Result<Option<String>> {
        self.value(identity, keys::REFRESH_TOKEN).await
    }

    /// `OAuth2` scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] if no equivalent account exists.
    pub async fn scope(&self, identity: &str) -> Result<Option<String>> {
        self.value(identity, keys::SCOPE).await
    }

    /// Auth token of `token_type` held in the vault.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] if no equivalent account exists, or
    /// a credential error if the vault fails.
    pub async fn auth_token(&self, identity: &str, token_type: &str) -> Result<Option<String>> {
        let name = self.resolve(identity).await?;
        let token_type = token_type.to_string();
        self.with_vault(move |vault| vault.auth_token(&name, &token_type))
            .await
    }

    /// Everything stored about an account, secrets excluded.
    ///
    /// # Errors
    ///
    /// Same as [`Self::base_url`].
    pub async fn account_info(&self, identity: &str) -> Result<AccountInfo> {
        let name = self.resolve(identity).await?;
        let base_url = self.base_url(&name).await?;
        let is_default = self.default_account().await?.as_deref() == Some(name.as_str());
        let backend = &self.backend;

        let server_version = backend.metadata(&name, keys::SERVER_VERSION).await?;
        let display_name = backend.metadata(&name, keys::DISPLAY_NAME).await?;
        let kind = backend.metadata(&name, keys::CREDENTIAL_KIND).await?;
        let account_version = backend.metadata(&name, keys::ACCOUNT_VERSION).await?;
        let scope = backend.metadata(&name, keys::SCOPE).await?;

        Ok(AccountInfo {
            name,
            base_url,
            server_version,
            display_name,
            credential_kind: CredentialKind::from_stored(kind.as_deref()),
            account_version,
            scope,
            is_default,
        })
    }
}
