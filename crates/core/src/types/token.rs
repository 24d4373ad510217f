//! Admin API access token type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// An offline Admin API access token obtained through OAuth.
///
/// The token authenticates every upstream API call for a shop, so it is
/// treated like a password: `Debug` and `Display` never reveal it. The raw
/// value is only reachable through [`AccessToken::as_str`], which call
/// sites use at the point the token is placed on a request header.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token value.
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self(token)
    }

    /// Returns the raw token for use in an authentication header.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `AccessToken` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&"[REDACTED]").finish()
    }
}
