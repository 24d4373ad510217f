//! Integration test harness for Saltline.
//!
//! Drives the session gate through a real axum `Router` with in-memory
//! stores on both sides: a tower-sessions `MemoryStore` for the cookie
//! session and an [`InMemorySessionStore`] for the stored shop sessions.
//! No database or network is involved, so these tests exercise exactly the
//! gating logic.
//!
//! # Test Router
//!
//! ```text
//! GET /seed            - (ungated) sign a shop in: store a session record
//!                        and point the cookie session at it
//! GET /echo-return-to  - (ungated) read back the stored return target
//! GET /protected       - (gated) reports the live activation count
//! GET /boom            - (gated) fails with an upstream credential rejection
//! ```

// Test-support crate: unwraps on infallible plumbing keep the harness small.
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::{Query, State},
    http::{Request, header},
    middleware::from_fn_with_state,
    response::Response,
    routing::get,
};
use secrecy::SecretString;
use serde::Deserialize;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session, SessionManagerLayer};

use saltline_app::config::{AppConfig, ShopifyConfig};
use saltline_app::error::AppError;
use saltline_app::middleware::{CurrentShop, require_same_shop, require_shop_session};
use saltline_app::models::{ShopSession, session_keys};
use saltline_app::sessions::InMemorySessionStore;
use saltline_app::shopify::ShopifyError;
use saltline_app::state::AppState;
use saltline_core::{AccessToken, ShopDomain};

/// Build an [`AppConfig`] without touching the environment.
#[must_use]
pub fn test_config(embedded: bool) -> AppConfig {
    AppConfig {
        database_url: SecretString::from("postgres://localhost/saltline_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "https://app.saltline.test".to_string(),
        embedded,
        login_path: None,
        shopify: ShopifyConfig {
            api_key: "test_api_key".to_string(),
            api_secret: SecretString::from("kJ8#mN2$pQ5^rS9&tV3*wX6!yZ4@aC7"),
            scopes: "read_products".to_string(),
            api_version: "2026-01".to_string(),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 1.0,
    }
}

/// Build an [`AppState`] over in-memory shop session storage.
#[must_use]
pub fn test_state(embedded: bool) -> AppState {
    AppState::new(test_config(embedded), Arc::new(InMemorySessionStore::new()))
}

/// A gated test application plus the state behind it.
pub struct TestApp {
    /// Router with the session gate applied to `/protected` and `/boom`.
    pub router: Router,
    /// Shared state, for asserting on activation counts and stored sessions.
    pub state: AppState,
}

#[derive(Deserialize)]
struct SeedQuery {
    shop: String,
}

/// Ungated: create a stored shop session and sign the cookie session in.
async fn seed(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<SeedQuery>,
) -> String {
    let record = ShopSession::new(
        ShopDomain::parse(&query.shop).unwrap(),
        AccessToken::new("shpat_integration_test".to_string()),
        "read_products".to_string(),
    );
    let id = state.sessions().store(record).await.unwrap();

    session.insert(session_keys::SHOP_SESSION, id).await.unwrap();
    session
        .insert(session_keys::SHOP_DOMAIN, query.shop)
        .await
        .unwrap();

    id.to_string()
}

/// Ungated: read back the stored post-login return target.
async fn echo_return_to(session: Session) -> String {
    session
        .get::<String>(session_keys::RETURN_TO)
        .await
        .unwrap()
        .unwrap_or_default()
}

/// Gated: report how many activations the client currently holds.
async fn protected(State(state): State<AppState>, CurrentShop(shop): CurrentShop) -> String {
    format!(
        "shop={} active={}",
        shop.shop(),
        state.shopify().active_sessions()
    )
}

/// Gated: fail the way a handler does when the upstream rejects the token.
async fn upstream_rejects() -> Result<&'static str, AppError> {
    Err(AppError::Shopify(ShopifyError::Unauthorized))
}

impl TestApp {
    /// Build the test application.
    #[must_use]
    pub fn new(embedded: bool) -> Self {
        let state = test_state(embedded);

        let gated = Router::new()
            .route("/protected", get(protected))
            .route("/boom", get(upstream_rejects))
            .layer(from_fn_with_state(state.clone(), require_shop_session))
            .layer(from_fn_with_state(state.clone(), require_same_shop));

        let router = Router::new()
            .route("/seed", get(seed))
            .route("/echo-return-to", get(echo_return_to))
            .merge(gated)
            .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false))
            .with_state(state.clone());

        Self { router, state }
    }

    /// Send a request through the app.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// GET a path, optionally replaying a session cookie, optionally as XHR.
    pub async fn get(&self, path: &str, cookie: Option<&str>, xhr: bool) -> Response {
        let mut builder = Request::builder().uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        if xhr {
            builder = builder.header("x-requested-with", "XMLHttpRequest");
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    /// POST a path with an empty body, optionally replaying a session cookie.
    pub async fn post(&self, path: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(path).method("POST");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    /// Sign a shop in and return the session cookie to replay.
    pub async fn sign_in(&self, shop: &str) -> String {
        let response = self.get(&format!("/seed?shop={shop}"), None, false).await;
        assert!(response.status().is_success(), "seeding must succeed");
        session_cookie(&response).expect("seed response sets a session cookie")
    }
}

/// Extract the session cookie pair from a response, if one was set.
#[must_use]
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(ToString::to_string)
}

/// Read a response body to a string.
pub async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// The `Location` header of a redirect response.
#[must_use]
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
