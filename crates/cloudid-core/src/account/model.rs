//! Account model types.

use serde::{Deserialize, Serialize};

/// Version of the per-account metadata layout written by this crate.
pub const ACCOUNT_VERSION: u32 = 1;

/// Metadata keys stored against each account.
pub mod keys {
    /// Metadata layout version.
    pub const ACCOUNT_VERSION: &str = "account_version";
    /// Server product version.
    pub const SERVER_VERSION: &str = "server_version";
    /// Effective server base URL.
    pub const BASE_URL: &str = "base_url";
    /// User display name.
    pub const DISPLAY_NAME: &str = "display_name";
    /// How the account was provisioned, see [`super::CredentialKind`].
    pub const CREDENTIAL_KIND: &str = "credential_kind";
    /// `OAuth2` refresh token.
    pub const REFRESH_TOKEN: &str = "oauth2_refresh_token";
    /// `OAuth2` granted scope.
    pub const SCOPE: &str = "oauth2_scope";
}

/// Preference key holding the selected account name.
pub const SELECTED_ACCOUNT: &str = "selected_account";

/// How an account's credentials were provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    /// Username and password.
    #[default]
    Basic,
    /// `OAuth2` token exchange.
    OAuth,
}

impl CredentialKind {
    /// Value stored under [`keys::CREDENTIAL_KIND`].
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::OAuth => "oauth",
        }
    }

    /// Parse a stored value. Unknown or missing values read as basic.
    #[must_use]
    pub fn from_stored(value: Option<&str>) -> Self {
        match value {
            Some("oauth") => Self::OAuth,
            _ => Self::Basic,
        }
    }
}

impl std::fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server metadata resolved before provisioning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server base URL, e.g. `https://cloud.example.com`.
    pub base_url: String,
    /// Server product version string.
    pub server_version: String,
}

impl ServerInfo {
    /// Create server info for `base_url` with an empty version.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            server_version: String::new(),
        }
    }

    /// Set the server version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.server_version = version.into();
        self
    }
}

/// User profile resolved before provisioning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Name shown to the user.
    pub display_name: String,
}

impl UserInfo {
    /// Create user info with the given display name.
    #[must_use]
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
        }
    }
}

/// Token material for an `OAuth2` provisioned account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthGrant {
    /// Token type the access token is stored under (e.g. `bearer`).
    pub token_type: String,
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Scope granted by the authorization server.
    pub scope: Option<String>,
}

impl OAuthGrant {
    /// Creates a grant without scope.
    #[must_use]
    pub fn new(
        token_type: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            token_type: token_type.into(),
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            scope: None,
        }
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}
