//! Cookie session layer configuration.
//!
//! Sets up `PostgreSQL`-backed cookie sessions using tower-sessions. The
//! cookie must be readable inside the Shopify admin iframe, which is a
//! third-party context - hence `SameSite=None` rather than the `Lax` or
//! `Strict` a first-party app would use.

use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AppConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "saltline_session";

/// Session expiry time in seconds (24 hours).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Create the session layer over a `PostgreSQL` store.
///
/// The store's schema must already exist; `main` runs the store migration
/// before serving.
///
/// # Arguments
///
/// * `store` - `PostgreSQL` session store
/// * `config` - Application configuration (for determining HTTPS mode)
#[must_use]
pub fn create_session_layer(
    store: PostgresStore,
    config: &AppConfig,
) -> SessionManagerLayer<PostgresStore> {
    let is_secure = config.base_url.starts_with("https://");

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        // Third-party iframe context: browsers only send the cookie with
        // SameSite=None (which in turn requires Secure in production).
        .with_same_site(tower_sessions::cookie::SameSite::None)
        .with_http_only(true)
        .with_path("/")
}
