//! Integration tests for the login flow and the full-page redirect modes.
//!
//! These run against the real application router (the same one `main`
//! serves), wrapped in an in-memory cookie session layer.

#![allow(clippy::unwrap_used)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use tower::ServiceExt;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use saltline_app::routes;
use saltline_integration_tests::{body_string, location, test_state};

const SHOP: &str = "driftwood-supply.myshopify.com";

fn real_app(embedded: bool) -> Router {
    routes::router(test_state(embedded))
        .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false))
}

async fn get(app: &Router, path: &str, xhr: bool) -> axum::response::Response {
    let mut builder = Request::builder().uri(path);
    if xhr {
        builder = builder.header("x-requested-with", "XMLHttpRequest");
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

// =============================================================================
// Full-page redirect modes
// =============================================================================

#[tokio::test]
async fn test_embedded_login_renders_escape_script() {
    let app = real_app(true);

    let response = get(&app, &format!("/login?shop={SHOP}"), false).await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;

    // Top-window path navigates directly.
    assert!(html.contains("window.top.location.href"));
    // Framed path relays through the admin chrome, scoped to the shop origin.
    assert!(html.contains("Shopify.API.remoteRedirect"));
    assert!(html.contains(&format!("\"https://{SHOP}\"")));
    // Both paths target the OAuth authorization page.
    assert!(html.contains("/admin/oauth/authorize"));
}

#[tokio::test]
async fn test_standalone_login_uses_plain_redirect() {
    let app = real_app(false);

    let response = get(&app, &format!("/login?shop={SHOP}"), false).await;

    assert!(response.status().is_redirection());
    let target = location(&response);
    assert!(target.starts_with(&format!("https://{SHOP}/admin/oauth/authorize?")));
    assert!(target.contains("client_id=test_api_key"));
    assert!(target.contains("state="));
}

// =============================================================================
// Login page
// =============================================================================

#[tokio::test]
async fn test_login_without_shop_renders_prompt() {
    let app = real_app(true);

    let response = get(&app, "/login", false).await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("name=\"shop\""));
}

#[tokio::test]
async fn test_login_with_invalid_shop_reprompts() {
    let app = real_app(true);

    let response = get(&app, "/login?shop=evil.com", false).await;

    // No redirect to a foreign host; the merchant is asked again.
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("does not look like a shop domain"));
}

// =============================================================================
// Gated routes on the real router
// =============================================================================

#[tokio::test]
async fn test_home_without_session_redirects_to_login() {
    let app = real_app(true);

    let response = get(&app, "/", false).await;

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_api_route_without_session_is_401_for_xhr() {
    let app = real_app(true);

    let response = get(&app, "/api/shop", true).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// OAuth callback failure paths
// =============================================================================

#[tokio::test]
async fn test_callback_with_no_handshake_in_flight_returns_to_login() {
    let app = real_app(true);

    let response = get(
        &app,
        &format!("/auth/callback?code=abc&state=forged&shop={SHOP}"),
        false,
    )
    .await;

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), format!("/login?shop={SHOP}"));
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = real_app(true);

    let live = get(&app, "/health", false).await;
    assert_eq!(live.status(), StatusCode::OK);
    assert_eq!(body_string(live).await, "ok");

    let ready = get(&app, "/health/ready", false).await;
    assert_eq!(ready.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_clears_and_redirects_to_login() {
    let app = real_app(true);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/logout")
                .method("POST")
                .header(header::COOKIE, "saltline_session=unknown")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/login");
}
