//! Integration tests for the session gate.
//!
//! Each test drives the gate through a real router; see the harness docs
//! in `src/lib.rs` for the test route table.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use saltline_integration_tests::{TestApp, body_string, location, session_cookie};

const SHOP: &str = "driftwood-supply.myshopify.com";
const OTHER_SHOP: &str = "rival-emporium.myshopify.com";

// =============================================================================
// Unauthenticated requests
// =============================================================================

#[tokio::test]
async fn test_no_session_redirects_to_login() {
    let app = TestApp::new(true);

    let response = app.get("/protected", None, false).await;

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_no_session_with_shop_param_carries_shop_to_login() {
    let app = TestApp::new(true);

    let response = app.get(&format!("/protected?shop={SHOP}"), None, false).await;

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), format!("/login?shop={SHOP}"));
}

#[tokio::test]
async fn test_no_session_xhr_gets_401_with_no_body() {
    let app = TestApp::new(true);

    let response = app.get("/protected", None, true).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_string(response).await.is_empty());
}

#[tokio::test]
async fn test_get_request_path_is_kept_as_return_target() {
    let app = TestApp::new(true);

    let response = app.get("/protected?page=2", None, false).await;
    assert!(response.status().is_redirection());
    let cookie = session_cookie(&response).unwrap();

    let echoed = app.get("/echo-return-to", Some(&cookie), false).await;
    assert_eq!(body_string(echoed).await, "/protected?page=2");
}

#[tokio::test]
async fn test_non_get_request_path_is_not_kept() {
    let app = TestApp::new(true);

    let response = app.post("/protected", None).await;
    assert!(response.status().is_redirection());
    let cookie = session_cookie(&response);

    // The redirect may not even have touched the session; if it did, the
    // return target must still be empty.
    if let Some(cookie) = cookie {
        let echoed = app.get("/echo-return-to", Some(&cookie), false).await;
        assert_eq!(body_string(echoed).await, "");
    }
}

// =============================================================================
// Authenticated requests
// =============================================================================

#[tokio::test]
async fn test_stored_session_reaches_handler_with_activation() {
    let app = TestApp::new(true);
    let cookie = app.sign_in(SHOP).await;

    let response = app.get("/protected", Some(&cookie), false).await;

    assert_eq!(response.status(), StatusCode::OK);
    // Exactly one activation was live while the handler ran.
    assert_eq!(body_string(response).await, format!("shop={SHOP} active=1"));
    // And it was released once the response was produced.
    assert_eq!(app.state.shopify().active_sessions(), 0);
}

#[tokio::test]
async fn test_activation_is_released_after_handler_error() {
    let app = TestApp::new(true);
    let cookie = app.sign_in(SHOP).await;

    let _response = app.get("/boom", Some(&cookie), false).await;

    assert_eq!(app.state.shopify().active_sessions(), 0);
}

#[tokio::test]
async fn test_matching_shop_param_passes() {
    let app = TestApp::new(true);
    let cookie = app.sign_in(SHOP).await;

    let response = app
        .get(&format!("/protected?shop={SHOP}"), Some(&cookie), false)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_empty_shop_param_is_ignored() {
    let app = TestApp::new(true);
    let cookie = app.sign_in(SHOP).await;

    let response = app.get("/protected?shop=", Some(&cookie), false).await;

    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Shop mismatch
// =============================================================================

#[tokio::test]
async fn test_different_shop_param_clears_session_and_redirects() {
    let app = TestApp::new(true);
    let cookie = app.sign_in(SHOP).await;

    let response = app
        .get(&format!("/protected?shop={OTHER_SHOP}"), Some(&cookie), false)
        .await;

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), format!("/login?shop={OTHER_SHOP}"));

    // The session reference is gone: the next request is unauthenticated.
    let followup = app.get("/protected", Some(&cookie), false).await;
    assert!(followup.status().is_redirection());
    assert_eq!(location(&followup), "/login");
}

// =============================================================================
// Upstream credential rejection
// =============================================================================

#[tokio::test]
async fn test_upstream_rejection_recovers_to_login_redirect() {
    let app = TestApp::new(true);
    let cookie = app.sign_in(SHOP).await;

    let response = app.get("/boom", Some(&cookie), false).await;

    // Not an unhandled 401/500: the gate recovered it into a login redirect.
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/login");

    // And the dead session reference was dropped.
    let followup = app.get("/protected", Some(&cookie), false).await;
    assert!(followup.status().is_redirection());
    assert_eq!(location(&followup), "/login");
}
