//! Security headers middleware.
//!
//! The interesting part for an embedded app is framing: the whole product
//! runs inside the Shopify admin's iframe, so the usual "deny all framing"
//! posture would brick it. Embedded mode allows the admin chrome as a
//! frame ancestor and nothing else; non-embedded deployments lock framing
//! down entirely.

use axum::{
    extract::{Request, State},
    http::{
        HeaderValue,
        header::{
            CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

/// CSP for embedded mode. `unsafe-inline` is required by the injected
/// full-page redirect script; `frame-ancestors` admits the admin chrome.
const EMBEDDED_CSP: &str = "default-src 'self'; \
     script-src 'self' 'unsafe-inline'; \
     style-src 'self' 'unsafe-inline'; \
     img-src 'self' https://cdn.shopify.com; \
     frame-ancestors https://*.myshopify.com https://admin.shopify.com";

/// CSP for standalone mode: nothing may frame the app.
const STANDALONE_CSP: &str = "default-src 'self'; \
     script-src 'self' 'unsafe-inline'; \
     style-src 'self' 'unsafe-inline'; \
     img-src 'self' https://cdn.shopify.com; \
     frame-ancestors 'none'";

/// Add security headers to all responses.
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let embedded = state.config().embedded;
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("origin-when-cross-origin"));

    if embedded {
        // No X-Frame-Options here: it cannot express an ancestor allow-list
        // and would override the CSP frame-ancestors directive.
        headers.insert(
            CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(EMBEDDED_CSP),
        );
    } else {
        headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        headers.insert(
            CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(STANDALONE_CSP),
        );
    }

    response
}
