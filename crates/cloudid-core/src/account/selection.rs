//! Default (selected) account tracking.

use tracing::{debug, info, warn};

use super::identity::{AccountName, find_equivalent};
use super::model::SELECTED_ACCOUNT;
use super::store::AccountStore;
use crate::backend::{AccountBackend, PreferenceStore};
use crate::{Error, Result};

impl<B> AccountStore<B>
where
    B: AccountBackend + PreferenceStore,
{
    /// The currently selected account.
    ///
    /// A stored selection that no longer names a registered account reads as
    /// no selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend query fails.
    pub async fn default_account(&self) -> Result<Option<String>> {
        let Some(selected) = self.backend.string(SELECTED_ACCOUNT).await? else {
            return Ok(None);
        };

        let accounts = self.accounts().await?;
        if accounts.contains(&selected) {
            Ok(Some(selected))
        } else {
            warn!("Selected account {selected} is no longer registered");
            Ok(None)
        }
    }

    /// Select `name` unless an account is already selected.
    ///
    /// Returns whether the selection was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend query or write fails.
    pub async fn set_default_if_absent(&self, name: &str) -> Result<bool> {
        if self.default_account().await?.is_some() {
            debug!("Default account already set, keeping it");
            return Ok(false);
        }

        self.backend.set_string(SELECTED_ACCOUNT, name).await?;
        info!("Default account set to {name}");
        Ok(true)
    }

    /// Explicitly select the account equivalent to `identity`.
    ///
    /// Returns the registered name now selected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] if no equivalent account exists.
    pub async fn switch_default(&self, identity: &str) -> Result<String> {
        let accounts = self.accounts().await?;
        let name = find_equivalent(&AccountName::parse(identity), &accounts)
            .ok_or_else(|| Error::AccountNotFound(identity.to_string()))?
            .to_string();

        self.backend.set_string(SELECTED_ACCOUNT, &name).await?;
        info!("Switched default account to {name}");
        Ok(name)
    }

    /// Forget the current selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub async fn clear_default(&self) -> Result<()> {
        self.backend.remove(SELECTED_ACCOUNT).await?;
        debug!("Cleared default account");
        Ok(())
    }
}
