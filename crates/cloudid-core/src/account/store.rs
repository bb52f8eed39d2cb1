//! Account registry: creation and update of accounts.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::credentials::{CredentialResult, CredentialVault};
use super::identity::{AccountName, find_equivalent};
use super::model::{ACCOUNT_VERSION, CredentialKind, OAuthGrant, ServerInfo, UserInfo, keys};
use crate::backend::{AccountBackend, PreferenceStore};
use crate::config::StoreConfig;
use crate::{Error, Result};

/// Local store of server accounts.
///
/// Owns the persisted account set, the per-account metadata, and the
/// selected-account preference. Create and update calls are serialized so a
/// single store never races its own existence checks.
pub struct AccountStore<B> {
    pub(super) backend: Arc<B>,
    pub(super) vault: Arc<dyn CredentialVault>,
    pub(super) account_type: String,
    registry_lock: Mutex<()>,
}

/// Account record a provisioning call writes to.
struct Target {
    name: String,
    server_info: ServerInfo,
    /// No equivalent account existed; the record is created on commit.
    is_new: bool,
}

impl<B> AccountStore<B>
where
    B: AccountBackend + PreferenceStore,
{
    /// Create a store over the given backend and vault.
    #[must_use]
    pub fn new(backend: Arc<B>, vault: Arc<dyn CredentialVault>, config: &StoreConfig) -> Self {
        Self {
            backend,
            vault,
            account_type: config.account_type.clone(),
            registry_lock: Mutex::new(()),
        }
    }

    /// Account type this store lists and creates accounts under.
    #[must_use]
    pub fn account_type(&self) -> &str {
        &self.account_type
    }

    /// Names of all registered accounts, in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend query fails.
    pub async fn accounts(&self) -> Result<Vec<String>> {
        self.backend.list_accounts(&self.account_type).await
    }

    /// Provision an account authenticated by username and password.
    ///
    /// `prior_base_url`, when given, replaces `server_info.base_url` (server
    /// moved since the account was set up). With `update_if_exists` the
    /// username must match the current default account's user and an
    /// existing equivalent account is reused instead of rejected.
    ///
    /// The password is written before the account record, so a failing vault
    /// leaves no account behind.
    ///
    /// Returns the registered account name.
    ///
    /// # Errors
    ///
    /// - [`Error::AccountMismatch`] if updating for a user other than the default's
    /// - [`Error::AccountAlreadyExists`] if the account exists and update was not requested
    /// - [`Error::InvalidBaseUrl`] if the base URL has no usable authority
    /// - storage errors from the backend or vault
    pub async fn add_basic_account(
        &self,
        prior_base_url: Option<&str>,
        username: &str,
        password: &str,
        server_info: &ServerInfo,
        user_info: &UserInfo,
        update_if_exists: bool,
    ) -> Result<String> {
        let _guard = self.registry_lock.lock().await;

        let target = self
            .prepare(prior_base_url, username, server_info, update_if_exists)
            .await?;

        let (account, password) = (target.name.clone(), password.to_string());
        self.with_vault(move |vault| vault.store_password(&account, &password))
            .await?;
        self.commit(&target, user_info, CredentialKind::Basic, &[])
            .await?;

        info!("Provisioned basic account {}", target.name);
        Ok(target.name)
    }

    /// Provision an account authenticated through an `OAuth2` grant.
    ///
    /// Same rules as [`Self::add_basic_account`]; no password is stored. The
    /// access token goes into the vault under `grant.token_type`, the refresh
    /// token and scope into metadata.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_basic_account`].
    pub async fn add_oauth_account(
        &self,
        prior_base_url: Option<&str>,
        username: &str,
        grant: &OAuthGrant,
        server_info: &ServerInfo,
        user_info: &UserInfo,
        update_if_exists: bool,
    ) -> Result<String> {
        let _guard = self.registry_lock.lock().await;

        let target = self
            .prepare(prior_base_url, username, server_info, update_if_exists)
            .await?;

        let account = target.name.clone();
        let (token_type, token) = (grant.token_type.clone(), grant.access_token.clone());
        self.with_vault(move |vault| vault.set_auth_token(&account, &token_type, &token))
            .await?;

        let mut oauth_entries = vec![(keys::REFRESH_TOKEN, grant.refresh_token.as_str())];
        if let Some(scope) = &grant.scope {
            oauth_entries.push((keys::SCOPE, scope.as_str()));
        }
        self.commit(&target, user_info, CredentialKind::OAuth, &oauth_entries)
            .await?;

        info!("Provisioned OAuth account {}", target.name);
        Ok(target.name)
    }

    /// Run a blocking vault operation off the async worker threads.
    pub(super) async fn with_vault<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&dyn CredentialVault) -> CredentialResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let vault = Arc::clone(&self.vault);
        Ok(tokio::task::spawn_blocking(move || op(&*vault)).await??)
    }

    /// Check the provisioning rules and resolve the account to write.
    ///
    /// Nothing is persisted here.
    async fn prepare(
        &self,
        prior_base_url: Option<&str>,
        username: &str,
        server_info: &ServerInfo,
        update_if_exists: bool,
    ) -> Result<Target> {
        if update_if_exists {
            let current = self.default_account().await?;
            let current_user = current
                .as_deref()
                .map(|name| AccountName::parse(name).username().to_string());
            if current_user.as_deref() != Some(username) {
                return Err(Error::AccountMismatch {
                    expected: current_user,
                    requested: username.to_string(),
                });
            }
        }

        let mut server_info = server_info.clone();
        if let Some(base_url) = prior_base_url {
            server_info.base_url = base_url.to_string();
        }

        let candidate = AccountName::from_base_url(username, &server_info.base_url)?;
        let existing = self.accounts().await?;

        if let Some(found) = find_equivalent(&candidate, &existing) {
            if !update_if_exists {
                debug!("Account {found} already exists");
                return Err(Error::AccountAlreadyExists(found.to_string()));
            }
            debug!("Updating existing account {found}");
            return Ok(Target {
                name: found.to_string(),
                server_info,
                is_new: false,
            });
        }

        Ok(Target {
            name: candidate.to_string(),
            server_info,
            is_new: true,
        })
    }

    /// Create the record if needed, write its metadata and select it when
    /// nothing is selected yet.
    ///
    /// A record created here is deleted again if a later step fails.
    async fn commit(
        &self,
        target: &Target,
        user_info: &UserInfo,
        kind: CredentialKind,
        extra: &[(&str, &str)],
    ) -> Result<()> {
        if target.is_new {
            if !self
                .backend
                .create_account(&self.account_type, &target.name)
                .await?
            {
                return Err(Error::AccountAlreadyExists(target.name.clone()));
            }
            info!("Created account {}", target.name);
        }

        let result = self.finish(target, user_info, kind, extra).await;
        if result.is_err() && target.is_new {
            warn!("Rolling back account {}", target.name);
            if let Err(e) = self.backend.delete_account(&target.name).await {
                warn!("Failed to roll back account {}: {e}", target.name);
            }
        }
        result
    }

    async fn finish(
        &self,
        target: &Target,
        user_info: &UserInfo,
        kind: CredentialKind,
        extra: &[(&str, &str)],
    ) -> Result<()> {
        self.update_user_and_server_info(&target.name, &target.server_info, user_info, kind)
            .await?;
        for (key, value) in extra {
            self.backend.set_metadata(&target.name, key, value).await?;
        }
        if target.is_new {
            self.set_default_if_absent(&target.name).await?;
        }
        Ok(())
    }

    async fn update_user_and_server_info(
        &self,
        name: &str,
        server_info: &ServerInfo,
        user_info: &UserInfo,
        kind: CredentialKind,
    ) -> Result<()> {
        let version = ACCOUNT_VERSION.to_string();
        let entries = [
            (keys::ACCOUNT_VERSION, version.as_str()),
            (keys::SERVER_VERSION, server_info.server_version.as_str()),
            (keys::BASE_URL, server_info.base_url.as_str()),
            (keys::DISPLAY_NAME, user_info.display_name.as_str()),
            (keys::CREDENTIAL_KIND, kind.as_str()),
        ];

        for (key, value) in entries {
            self.backend.set_metadata(name, key, value).await?;
        }
        debug!("Wrote server and user info for {name}");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::similar_names)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::account::model::SELECTED_ACCOUNT;
    use crate::backend::MemoryBackend;

    pub(crate) fn store() -> (AccountStore<MemoryBackend>, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = AccountStore::new(backend.clone(), backend.clone(), &StoreConfig::default());
        (store, backend)
    }

    pub(crate) fn server() -> ServerInfo {
        ServerInfo::new("https://cloud.example.com").with_version("10.11.0")
    }

    pub(crate) fn alice() -> UserInfo {
        UserInfo::new("Alice")
    }

    pub(crate) fn grant() -> OAuthGrant {
        OAuthGrant::new("bearer", "tok1", "ref1").with_scope("files.read")
    }

    #[tokio::test]
    async fn basic_account_created() {
        let (store, backend) = store();

        let name = store
            .add_basic_account(None, "alice", "pw1", &server(), &alice(), false)
            .await
            .unwrap();

        assert_eq!(name, "alice@cloud.example.com");
        assert_eq!(store.accounts().await.unwrap(), vec![name.clone()]);
        assert_eq!(backend.password(&name).unwrap(), Some("pw1".to_string()));
        assert_eq!(
            backend.metadata(&name, keys::ACCOUNT_VERSION).await.unwrap(),
            Some("1".to_string())
        );
        assert_eq!(
            backend.metadata(&name, keys::SERVER_VERSION).await.unwrap(),
            Some("10.11.0".to_string())
        );
        assert_eq!(
            backend.metadata(&name, keys::DISPLAY_NAME).await.unwrap(),
            Some("Alice".to_string())
        );
        assert_eq!(
            backend.metadata(&name, keys::CREDENTIAL_KIND).await.unwrap(),
            Some("basic".to_string())
        );
    }

    #[tokio::test]
    async fn repeated_create_fails() {
        let (store, _) = store();
        store
            .add_basic_account(None, "alice", "pw1", &server(), &alice(), false)
            .await
            .unwrap();

        let err = store
            .add_basic_account(None, "alice", "pw1", &server(), &alice(), false)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AccountAlreadyExists(ref n) if n == "alice@cloud.example.com"));
        assert_eq!(store.accounts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn oauth_create_matches_case_insensitively() {
        let (store, _) = store();
        store
            .add_basic_account(None, "alice", "pw1", &server(), &alice(), false)
            .await
            .unwrap();

        let err = store
            .add_oauth_account(None, "Alice", &grant(), &server(), &alice(), false)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AccountAlreadyExists(_)));
    }

    #[tokio::test]
    async fn different_port_is_new_account() {
        let (store, _) = store();
        store
            .add_basic_account(None, "alice", "pw", &server(), &alice(), false)
            .await
            .unwrap();

        let other = ServerInfo::new("https://cloud.example.com:8443");
        let name = store
            .add_basic_account(None, "alice", "pw", &other, &alice(), false)
            .await
            .unwrap();

        assert_eq!(name, "alice@cloud.example.com:8443");
        assert_eq!(store.accounts().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn oauth_account_writes_tokens() {
        let (store, backend) = store();

        let name = store
            .add_oauth_account(None, "alice", &grant(), &server(), &alice(), false)
            .await
            .unwrap();

        assert_eq!(backend.password(&name).unwrap(), None);
        assert_eq!(
            backend.auth_token(&name, "bearer").unwrap(),
            Some("tok1".to_string())
        );
        assert_eq!(
            backend.metadata(&name, keys::REFRESH_TOKEN).await.unwrap(),
            Some("ref1".to_string())
        );
        assert_eq!(
            backend.metadata(&name, keys::SCOPE).await.unwrap(),
            Some("files.read".to_string())
        );
        assert_eq!(
            backend.metadata(&name, keys::CREDENTIAL_KIND).await.unwrap(),
            Some("oauth".to_string())
        );
    }

    #[tokio::test]
    async fn oauth_without_scope_leaves_scope_unset() {
        let (store, backend) = store();
        let grant = OAuthGrant::new("bearer", "tok1", "ref1");

        let name = store
            .add_oauth_account(None, "alice", &grant, &server(), &alice(), false)
            .await
            .unwrap();

        assert_eq!(backend.metadata(&name, keys::SCOPE).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_reuses_existing_account() {
        let (store, backend) = store();
        let name = store
            .add_basic_account(None, "alice", "pw1", &server(), &alice(), false)
            .await
            .unwrap();

        let newer = ServerInfo::new("https://cloud.example.com").with_version("10.12.0");
        let updated = store
            .add_oauth_account(None, "alice", &grant(), &newer, &UserInfo::new("Alice B"), true)
            .await
            .unwrap();

        assert_eq!(updated, name);
        assert_eq!(store.accounts().await.unwrap().len(), 1);
        assert_eq!(
            backend.metadata(&name, keys::SERVER_VERSION).await.unwrap(),
            Some("10.12.0".to_string())
        );
        assert_eq!(
            backend.metadata(&name, keys::DISPLAY_NAME).await.unwrap(),
            Some("Alice B".to_string())
        );
        assert_eq!(
            backend.metadata(&name, keys::CREDENTIAL_KIND).await.unwrap(),
            Some("oauth".to_string())
        );
    }

    #[tokio::test]
    async fn update_for_other_user_is_mismatch() {
        let (store, backend) = store();
        store
            .add_basic_account(None, "alice", "pw1", &server(), &alice(), false)
            .await
            .unwrap();

        let other = ServerInfo::new("https://other.example.com");
        let err = store
            .add_basic_account(None, "bob", "pw2", &other, &UserInfo::new("Bob"), true)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::AccountMismatch { ref expected, ref requested }
                if expected.as_deref() == Some("alice") && requested == "bob"
        ));
        assert_eq!(store.accounts().await.unwrap().len(), 1);
        assert_eq!(backend.metadata_count("bob@other.example.com"), 0);
        assert_eq!(backend.password("bob@other.example.com").unwrap(), None);
    }

    #[tokio::test]
    async fn update_username_compared_exactly() {
        let (store, _) = store();
        store
            .add_basic_account(None, "alice", "pw1", &server(), &alice(), false)
            .await
            .unwrap();

        let err = store
            .add_basic_account(None, "Alice", "pw1", &server(), &alice(), true)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AccountMismatch { .. }));
    }

    #[tokio::test]
    async fn update_without_default_is_mismatch() {
        let (store, _) = store();

        let err = store
            .add_basic_account(None, "alice", "pw1", &server(), &alice(), true)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AccountMismatch { expected: None, .. }));
        assert!(store.accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn prior_base_url_overrides_server() {
        let (store, backend) = store();

        let name = store
            .add_basic_account(
                Some("https://moved.example.com:8080"),
                "alice",
                "pw1",
                &server(),
                &alice(),
                false,
            )
            .await
            .unwrap();

        assert_eq!(name, "alice@moved.example.com:8080");
        assert_eq!(
            backend.metadata(&name, keys::BASE_URL).await.unwrap(),
            Some("https://moved.example.com:8080".to_string())
        );
    }

    #[tokio::test]
    async fn invalid_base_url_creates_nothing() {
        let (store, _) = store();

        let err = store
            .add_basic_account(None, "alice", "pw1", &ServerInfo::new("https://"), &alice(), false)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidBaseUrl { .. }));
        assert!(store.accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sqlite_backed_store() {
        use crate::backend::SqliteBackend;

        let backend = Arc::new(SqliteBackend::in_memory().await.unwrap());
        let vault = Arc::new(MemoryBackend::new());
        let store = AccountStore::new(backend, vault.clone(), &StoreConfig::default());

        let name = store
            .add_basic_account(None, "alice", "pw1", &server(), &alice(), false)
            .await
            .unwrap();
        let err = store
            .add_basic_account(None, "ALICE", "pw1", &server(), &alice(), false)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AccountAlreadyExists(_)));
        assert_eq!(store.default_account().await.unwrap(), Some(name.clone()));
        assert_eq!(vault.password(&name).unwrap(), Some("pw1".to_string()));
    }

    /// Vault that fails every write while `broken` is set.
    #[derive(Default)]
    struct FlakyVault {
        inner: MemoryBackend,
        broken: AtomicBool,
    }

    impl FlakyVault {
        fn broken() -> Self {
            Self {
                inner: MemoryBackend::new(),
                broken: AtomicBool::new(true),
            }
        }

        fn check(&self) -> CredentialResult<()> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(keyring::Error::NoStorageAccess("secret service unavailable".into()).into());
            }
            Ok(())
        }
    }

    impl CredentialVault for FlakyVault {
        fn store_password(&self, account: &str, password: &str) -> CredentialResult<()> {
            self.check()?;
            self.inner.store_password(account, password)
        }

        fn password(&self, account: &str) -> CredentialResult<Option<String>> {
            self.inner.password(account)
        }

        fn set_auth_token(
            &self,
            account: &str,
            token_type: &str,
            token: &str,
        ) -> CredentialResult<()> {
            self.check()?;
            self.inner.set_auth_token(account, token_type, token)
        }

        fn auth_token(&self, account: &str, token_type: &str) -> CredentialResult<Option<String>> {
            self.inner.auth_token(account, token_type)
        }
    }

    #[tokio::test]
    async fn vault_failure_leaves_no_account() {
        let backend = Arc::new(MemoryBackend::new());
        let vault = Arc::new(FlakyVault::broken());
        let store = AccountStore::new(backend.clone(), vault.clone(), &StoreConfig::default());

        let err = store
            .add_basic_account(None, "alice", "pw", &server(), &alice(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Credential(_)));

        let err = store
            .add_oauth_account(None, "alice", &grant(), &server(), &alice(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Credential(_)));

        assert!(store.accounts().await.unwrap().is_empty());
        assert_eq!(store.default_account().await.unwrap(), None);
        assert_eq!(backend.metadata_count("alice@cloud.example.com"), 0);

        vault.broken.store(false, Ordering::SeqCst);
        let name = store
            .add_basic_account(None, "alice", "pw", &server(), &alice(), false)
            .await
            .unwrap();

        assert_eq!(store.default_account().await.unwrap(), Some(name.clone()));
        assert_eq!(
            store.base_url(&name).await.unwrap(),
            "https://cloud.example.com"
        );
        assert_eq!(vault.password(&name).unwrap(), Some("pw".to_string()));
    }

    /// Backend whose metadata writes always fail.
    #[derive(Default)]
    struct ReadOnlyMetadata {
        inner: MemoryBackend,
    }

    impl AccountBackend for ReadOnlyMetadata {
        async fn list_accounts(&self, account_type: &str) -> Result<Vec<String>> {
            self.inner.list_accounts(account_type).await
        }

        async fn create_account(&self, account_type: &str, name: &str) -> Result<bool> {
            self.inner.create_account(account_type, name).await
        }

        async fn delete_account(&self, name: &str) -> Result<()> {
            self.inner.delete_account(name).await
        }

        async fn metadata(&self, name: &str, key: &str) -> Result<Option<String>> {
            self.inner.metadata(name, key).await
        }

        async fn set_metadata(&self, _name: &str, _key: &str, _value: &str) -> Result<()> {
            Err(std::io::Error::other("disk full").into())
        }
    }

    impl PreferenceStore for ReadOnlyMetadata {
        async fn string(&self, key: &str) -> Result<Option<String>> {
            self.inner.string(key).await
        }

        async fn set_string(&self, key: &str, value: &str) -> Result<()> {
            self.inner.set_string(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test]
    async fn metadata_failure_rolls_back_new_account() {
        let backend = Arc::new(ReadOnlyMetadata::default());
        let store = AccountStore::new(
            backend.clone(),
            Arc::new(MemoryBackend::new()),
            &StoreConfig::default(),
        );

        let err = store
            .add_basic_account(None, "alice", "pw", &server(), &alice(), false)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert!(store.accounts().await.unwrap().is_empty());
        assert_eq!(backend.inner.string(SELECTED_ACCOUNT).await.unwrap(), None);
    }

    #[tokio::test]
    async fn metadata_failure_keeps_existing_account() {
        let backend = Arc::new(ReadOnlyMetadata::default());
        backend
            .inner
            .create_account("cloudid", "alice@cloud.example.com")
            .await
            .unwrap();
        backend
            .inner
            .set_string(SELECTED_ACCOUNT, "alice@cloud.example.com")
            .await
            .unwrap();
        let store = AccountStore::new(
            backend.clone(),
            Arc::new(MemoryBackend::new()),
            &StoreConfig::default(),
        );

        let err = store
            .add_basic_account(None, "alice", "pw", &server(), &alice(), true)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert_eq!(
            store.accounts().await.unwrap(),
            vec!["alice@cloud.example.com"]
        );
    }

    #[tokio::test]
    async fn concurrent_creates_yield_one_account() {
        let (store, _) = store();
        let server = server();
        let user = alice();

        let (a, b) = tokio::join!(
            store.add_basic_account(None, "alice", "pw", &server, &user, false),
            store.add_basic_account(None, "ALICE", "pw", &server, &user, false),
        );

        assert_ne!(a.is_ok(), b.is_ok());
        assert_eq!(store.accounts().await.unwrap().len(), 1);
    }
}
