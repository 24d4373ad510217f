//! Session-related types for shop authentication.
//!
//! A [`ShopSession`] is the stored record a cookie-session reference points
//! at: the shop the merchant installed the app on plus the Admin API
//! credentials obtained for it during OAuth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use saltline_core::{AccessToken, ShopDomain};

/// A stored upstream API session for one shop.
///
/// Created when the OAuth callback exchanges an authorization code, looked
/// up on every gated request, and deleted on logout or when the upstream
/// rejects its token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopSession {
    /// Opaque identifier the cookie session stores as its reference.
    pub id: Uuid,
    /// Shop the session belongs to.
    pub shop: ShopDomain,
    /// Admin API access token for the shop.
    pub access_token: AccessToken,
    /// Scopes granted at install time.
    pub scopes: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl ShopSession {
    /// Create a new session record with a fresh identifier.
    #[must_use]
    pub fn new(shop: ShopDomain, access_token: AccessToken, scopes: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            shop,
            access_token,
            scopes,
            created_at: Utc::now(),
        }
    }
}

/// Session keys for shop authentication data.
pub mod keys {
    /// Key for the stored session reference.
    pub const SHOP_SESSION: &str = "shopify";

    /// Key for the signed-in shop's domain.
    pub const SHOP_DOMAIN: &str = "shopify_domain";

    /// Key for the path to return to after a login round-trip.
    pub const RETURN_TO: &str = "return_to";

    /// Key for the OAuth CSRF state nonce.
    pub const OAUTH_STATE: &str = "oauth_state";

    /// Key for the shop an OAuth handshake was started for.
    pub const OAUTH_SHOP: &str = "oauth_shop";
}
