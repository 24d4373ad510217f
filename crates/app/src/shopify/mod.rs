//! Shopify Admin API client and OAuth flow.
//!
//! The client is tenant-scoped: nothing can call the Admin API without
//! first activating a stored [`crate::models::ShopSession`], which hands
//! back a request-scoped [`ActiveSession`] guard. Deactivation is tied to
//! the guard's lifetime, so it happens on every exit path.

mod client;
pub mod oauth;

pub use client::{ActiveSession, ExchangedToken, ShopInfo, ShopifyClient};

use thiserror::Error;

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The shop rejected our access token. The stored session is dead and
    /// the merchant has to re-authenticate.
    #[error("access token rejected by shop")]
    Unauthorized,

    /// The API answered with a status we did not expect.
    #[error("unexpected status {status} from shopify")]
    UnexpectedStatus {
        /// HTTP status returned by the API.
        status: reqwest::StatusCode,
    },

    /// The OAuth token exchange failed.
    #[error("oauth code exchange failed: {0}")]
    OAuth(String),

    /// The OAuth callback carried a missing or invalid HMAC signature.
    #[error("invalid hmac signature on oauth callback")]
    InvalidHmac,
}
