//! Account management module.
//!
//! Provides account identity, provisioning, default selection and metadata
//! queries.

pub mod credentials;
mod identity;
mod metadata;
mod model;
mod selection;
mod store;

pub use credentials::{CredentialError, CredentialResult, CredentialVault, KeyringVault};
pub use identity::{AccountName, find_equivalent};
pub use metadata::AccountInfo;
pub use model::{
    ACCOUNT_VERSION, CredentialKind, OAuthGrant, SELECTED_ACCOUNT, ServerInfo, UserInfo, keys,
};
pub use store::AccountStore;
