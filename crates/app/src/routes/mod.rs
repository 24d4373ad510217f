//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (pings the session store)
//!
//! # Auth (public)
//! GET  /login                  - Shop prompt, or OAuth start with ?shop=
//! POST /login                  - Shop prompt submission
//! GET  /auth/callback          - OAuth callback
//! POST /logout                 - Log out
//!
//! # Gated (session gate applied)
//! GET  /                       - Home page for the signed-in shop
//! GET  /api/shop               - Shop resource as JSON
//! ```

pub mod auth;
pub mod home;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use crate::middleware::{require_same_shop, require_shop_session};
use crate::state::AppState;

/// Build the application router.
#[must_use]
pub fn router(state: AppState) -> Router {
    // The mismatch check wraps the session requirement so a cross-shop
    // request is thrown out before its session would be activated.
    let gated = Router::new()
        .route("/", get(home::home))
        .route("/api/shop", get(home::shop_info))
        .layer(from_fn_with_state(state.clone(), require_shop_session))
        .layer(from_fn_with_state(state.clone(), require_same_shop));

    Router::new()
        .route("/login", get(auth::login).post(auth::login_submit))
        .route("/auth/callback", get(auth::callback))
        .route("/logout", post(auth::logout))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(gated)
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the session store is reachable before returning OK.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.sessions().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!("readiness check failed: {e}");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
