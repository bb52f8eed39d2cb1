//! Account identity and equivalence matching.
//!
//! An account is identified by `username@authority`, where the authority is
//! the host (and explicit port) of the server base URL. Two identities refer
//! to the same account when their authorities are byte-equal and their
//! usernames are equal ignoring case.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Structured account identity.
///
/// Equality and hashing follow the account matching rule: exact authority,
/// case-insensitive username.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountName {
    username: String,
    authority: String,
}

impl AccountName {
    /// Create an identity from its parts.
    #[must_use]
    pub fn new(username: impl Into<String>, authority: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            authority: authority.into(),
        }
    }

    /// Parse a composite `username@authority` string.
    ///
    /// The split happens at the last `@`, so usernames may themselves contain
    /// `@` (e.g. e-mail style logins). A string without `@` yields the whole
    /// input as username and an empty authority.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.rsplit_once('@') {
            Some((username, authority)) => Self::new(username, authority),
            None => Self::new(name, ""),
        }
    }

    /// Build the identity for `username` on the server at `base_url`.
    ///
    /// URLs without a scheme are read as `https://`. The authority is taken
    /// from the URL as written: host casing and explicit ports, default ones
    /// included, are kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBaseUrl`] if the URL cannot be parsed or has no host.
    pub fn from_base_url(username: &str, base_url: &str) -> Result<Self> {
        Ok(Self::new(username, authority_of(base_url)?))
    }

    /// Username part, with its original casing.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Host and optional port.
    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    fn folded_username(&self) -> String {
        self.username.to_lowercase()
    }
}

impl PartialEq for AccountName {
    fn eq(&self, other: &Self) -> bool {
        self.authority == other.authority && self.folded_username() == other.folded_username()
    }
}

impl Eq for AccountName {}

impl Hash for AccountName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded_username().hash(state);
        self.authority.hash(state);
    }
}

impl std::fmt::Display for AccountName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.username, self.authority)
    }
}

/// Find the registered account name equivalent to `candidate`.
///
/// Returns the stored name exactly as registered, which may differ from the
/// candidate in username casing.
#[must_use]
pub fn find_equivalent<'a, I>(candidate: &AccountName, existing: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    existing
        .into_iter()
        .map(String::as_str)
        .find(|name| AccountName::parse(name) == *candidate)
}

/// Extract `host[:port]` from a server base URL, as typed.
///
/// Host casing and any explicit port are kept; the URL parser only checks
/// that the input is a valid URL with a host.
fn authority_of(base_url: &str) -> Result<String> {
    let invalid = |reason: &str| Error::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = base_url.trim();
    let (with_scheme, rest) = match trimmed.split_once("://") {
        Some((_, rest)) => (trimmed.to_string(), rest),
        None => (format!("https://{trimmed}"), trimmed),
    };

    let url = Url::parse(&with_scheme).map_err(|e| invalid(&e.to_string()))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }

    let authority = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let authority = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);
    if authority.is_empty() {
        return Err(invalid("missing host"));
    }

    Ok(authority.to_string())
}
