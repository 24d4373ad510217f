//! Unified error handling for the app.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::sessions::SessionStoreError;
use crate::shopify::ShopifyError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cookie session could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Shop session store operation failed.
    #[error("Session store error: {0}")]
    Store(#[from] SessionStoreError),

    /// Upstream Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Response-extension marker set when a handler failed because the
/// upstream rejected the active session's credentials.
///
/// The session gate looks for this marker on the way out and converts the
/// response into "clear session, redirect to login" - the error itself is
/// recovered at the boundary, never surfaced.
#[derive(Debug, Clone, Copy)]
pub struct UpstreamUnauthorized;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // An upstream credential rejection is not a server fault; it is a
        // signal the gate recovers from. Everything else that is
        // server-side gets captured.
        if let Self::Shopify(ShopifyError::Unauthorized) = &self {
            tracing::info!("upstream rejected the active session's token");
            let mut response = StatusCode::UNAUTHORIZED.into_response();
            response.extensions_mut().insert(UpstreamUnauthorized);
            return response;
        }

        if matches!(self, Self::Session(_) | Self::Store(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Session(_) | Self::Store(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Shopify(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Session(_) | Self::Store(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Shopify(_) => "External service error".to_string(),
            Self::BadRequest(_) => self.to_string(),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_upstream_unauthorized_is_marked() {
        let response = AppError::Shopify(ShopifyError::Unauthorized).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.extensions().get::<UpstreamUnauthorized>().is_some());
    }

    #[test]
    fn test_other_shopify_errors_are_not_marked() {
        let response = AppError::Shopify(ShopifyError::OAuth("denied".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.extensions().get::<UpstreamUnauthorized>().is_none());
    }

    #[test]
    fn test_bad_request_status() {
        let response = AppError::BadRequest("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
