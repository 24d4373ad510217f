//! Database operations for `PostgreSQL`.
//!
//! ## Tables
//!
//! - `shop_session` - Stored Admin API sessions, one row per OAuth handshake
//! - `session` - Cookie session storage (managed by tower-sessions)
//!
//! # Migrations
//!
//! Migrations live in `crates/app/migrations/` and run at startup.

pub mod sessions;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use sessions::PostgresSessionStore;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
