//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, start transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (correlate logs and Sentry events)
//! 4. Security headers (CSP with iframe-aware framing rules)
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. Session gate (per-route: shop mismatch check, then session requirement)

pub mod request_id;
pub mod security_headers;
pub mod session;
pub mod session_gate;

pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
pub use session_gate::{
    CurrentShop, clear_shop_session, close_session, fullpage_redirect_to, redirect_to_login,
    require_same_shop, require_shop_session,
};
