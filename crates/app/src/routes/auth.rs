//! Login, OAuth callback, and logout route handlers.
//!
//! The login flow is the other half of the session gate: the gate sends
//! unauthenticated requests here, this module runs the OAuth handshake
//! with the shop, and the callback writes the session reference the gate
//! reads on the next request.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Form, Query, RawQuery, State},
    response::{IntoResponse, Redirect, Response},
};
use rand::Rng;
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use saltline_core::ShopDomain;

use crate::error::AppError;
use crate::middleware::fullpage_redirect_to;
use crate::models::{ShopSession, session_keys};
use crate::state::AppState;

/// Query parameters for the login entry point.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Shop to start the OAuth handshake for.
    pub shop: Option<String>,
}

/// Form body for the shop-domain prompt.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Shop entered by the merchant.
    pub shop: String,
}

/// Query parameters from the Shopify OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for a token.
    pub code: Option<String>,
    /// Shop the handshake ran for.
    pub shop: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
}

/// Shop-domain prompt page.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    /// Validation message for a rejected shop domain, if any.
    pub error: Option<String>,
}

/// Generate a cryptographically secure random string.
fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            // SAFETY: idx is always within bounds since random_range returns 0..CHARSET.len()
            char::from(*CHARSET.get(idx).expect("idx within bounds"))
        })
        .collect()
}

/// Keep a stored return target only if it is a local path.
fn sanitize_return_to(path: Option<String>) -> String {
    path.filter(|p| p.starts_with('/') && !p.starts_with("//"))
        .unwrap_or_else(|| "/".to_string())
}

/// Login entry point.
///
/// Without a usable `shop` parameter this renders the shop-domain prompt.
/// With one it stores the CSRF state in the session and sends the merchant
/// to the shop's OAuth authorization page - through the full-page redirect
/// path, because the authorization page refuses to render inside the
/// admin iframe.
///
/// # Route
///
/// `GET /login`
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AppError> {
    let Some(shop_param) = query.shop.filter(|s| !s.is_empty()) else {
        return Ok(LoginTemplate { error: None }.into_response());
    };

    let shop = match ShopDomain::parse(&shop_param) {
        Ok(shop) => shop,
        Err(e) => {
            tracing::warn!(shop = %shop_param, "rejected shop parameter at login: {e}");
            return Ok(LoginTemplate {
                error: Some(format!("That does not look like a shop domain: {e}")),
            }
            .into_response());
        }
    };

    let oauth_state = generate_random_string(32);
    session
        .insert(session_keys::OAUTH_STATE, &oauth_state)
        .await?;
    session
        .insert(session_keys::OAUTH_SHOP, shop.as_str())
        .await?;

    let redirect_uri = state.config().oauth_redirect_uri();
    let authorize_url = state
        .shopify()
        .authorize_url(&shop, &redirect_uri, &oauth_state);

    Ok(fullpage_redirect_to(&state, Some(&shop), &authorize_url))
}

/// Shop-domain prompt submission.
///
/// # Route
///
/// `POST /login`
pub async fn login_submit(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Response {
    Redirect::to(&state.config().login_url(Some(form.shop.trim()))).into_response()
}

/// Handle the Shopify OAuth callback.
///
/// Validates the CSRF state and the HMAC signature, exchanges the
/// authorization code, persists the resulting shop session, and points the
/// cookie session at it. Every failure path lands back on the login page -
/// there is nothing a merchant can do with a half-finished handshake.
///
/// # Route
///
/// `GET /auth/callback`
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    RawQuery(raw_query): RawQuery,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    let back_to_login =
        |shop: Option<&str>| Redirect::to(&state.config().login_url(shop)).into_response();

    // CSRF state must match what the login handler stored (one-time use).
    let stored_state: Option<String> = session
        .get(session_keys::OAUTH_STATE)
        .await
        .ok()
        .flatten();
    let _ = session.remove::<String>(session_keys::OAUTH_STATE).await;

    if stored_state.is_none() || stored_state != query.state {
        tracing::warn!("oauth callback state mismatch");
        return Ok(back_to_login(query.shop.as_deref()));
    }

    let Some(shop_param) = query.shop else {
        tracing::warn!("oauth callback missing shop");
        return Ok(back_to_login(None));
    };
    let Ok(shop) = ShopDomain::parse(&shop_param) else {
        tracing::warn!(shop = %shop_param, "oauth callback with invalid shop");
        return Ok(back_to_login(None));
    };

    // The callback must come back for the shop the handshake started for.
    let started_for: Option<String> = session
        .get(session_keys::OAUTH_SHOP)
        .await
        .ok()
        .flatten();
    let _ = session.remove::<String>(session_keys::OAUTH_SHOP).await;

    if started_for.as_deref() != Some(shop.as_str()) {
        tracing::warn!(shop = %shop, "oauth callback for a different shop than requested");
        return Ok(back_to_login(Some(shop.as_str())));
    }

    if let Err(e) = state
        .shopify()
        .verify_callback(raw_query.as_deref().unwrap_or_default())
    {
        tracing::warn!(shop = %shop, "oauth callback rejected: {e}");
        return Ok(back_to_login(Some(shop.as_str())));
    }

    let Some(code) = query.code else {
        tracing::warn!(shop = %shop, "oauth callback missing code");
        return Ok(back_to_login(Some(shop.as_str())));
    };

    let exchanged = match state.shopify().exchange_code(&shop, &code).await {
        Ok(exchanged) => exchanged,
        Err(e) => {
            tracing::error!(shop = %shop, "oauth code exchange failed: {e}");
            return Ok(back_to_login(Some(shop.as_str())));
        }
    };

    let record = ShopSession::new(shop.clone(), exchanged.access_token, exchanged.scope);
    let id = state.sessions().store(record).await?;

    session.insert(session_keys::SHOP_SESSION, id).await?;
    session
        .insert(session_keys::SHOP_DOMAIN, shop.as_str())
        .await?;

    tracing::info!(shop = %shop, "shop authenticated");

    let return_to = session
        .remove::<String>(session_keys::RETURN_TO)
        .await
        .ok()
        .flatten();
    Ok(Redirect::to(&sanitize_return_to(return_to)).into_response())
}

/// Log out the current shop.
///
/// Deletes the stored API session and wipes the cookie session.
///
/// # Route
///
/// `POST /logout`
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    if let Ok(Some(id)) = session.get::<Uuid>(session_keys::SHOP_SESSION).await
        && let Err(e) = state.sessions().delete(id).await
    {
        tracing::warn!(session_id = %id, "failed to delete shop session: {e}");
    }

    session.flush().await?;

    Ok(Redirect::to(&state.config().login_url(None)).into_response())
}
