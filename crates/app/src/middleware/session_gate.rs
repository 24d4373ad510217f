//! Session gate for requests served inside the Shopify admin.
//!
//! Two layers applied to every gated route, outermost first:
//!
//! 1. [`require_same_shop`] - a request carrying a `shop` parameter for a
//!    different shop than the signed-in one invalidates the session and
//!    forces a fresh login. Without this, a merchant switching stores in
//!    the admin would keep acting on the previous store's data.
//! 2. [`require_shop_session`] - resolves the session reference to a
//!    stored [`ShopSession`](crate::models::ShopSession), activates it
//!    against the Admin API client for the duration of the request, and
//!    sends everyone else to the login flow. Deactivation rides on the
//!    activation guard's `Drop`, so it happens whether the handler
//!    returned, errored, or unwound.
//!
//! An upstream credential rejection anywhere downstream surfaces as an
//! [`UpstreamUnauthorized`] response marker; the gate catches it on the way
//! out, drops the dead session reference, and redirects to login instead
//! of letting a 401 leak to the merchant.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, Method, StatusCode, Uri, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use url::form_urlencoded;
use uuid::Uuid;

use saltline_core::ShopDomain;

use crate::error::UpstreamUnauthorized;
use crate::models::{ShopSession, session_keys};
use crate::shopify::ActiveSession;
use crate::state::AppState;

/// Header a browser XHR layer sets on asynchronous requests.
const REQUESTED_WITH_HEADER: &str = "x-requested-with";

/// Gate a request on a valid stored shop session.
///
/// With a resolvable session: activate it, expose the activation to the
/// handler through request extensions, run the handler. Without one:
/// redirect to login (or bare 401 for XHR). See the module docs for the
/// upstream-401 recovery path.
pub async fn require_shop_session(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    let shop_param = shop_query_param(request.uri());

    let Some(record) = load_shop_session(&state, &session).await else {
        return redirect_to_login(&state, &session, request, shop_param.as_deref()).await;
    };

    let active = state.shopify().activate(&record);
    let mut request = request;
    request.extensions_mut().insert(active);

    let response = next.run(request).await;

    if response.extensions().get::<UpstreamUnauthorized>().is_some() {
        return close_session(&state, &session, shop_param.as_deref()).await;
    }

    response
}

/// Force re-login when a request targets a different shop than the one
/// signed in.
///
/// Only a non-empty scalar `shop` parameter participates; a missing,
/// empty, or array-style parameter (`shop[]=...`) is ignored.
pub async fn require_same_shop(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    if let Some(shop) = shop_query_param(request.uri()).filter(|s| !s.is_empty())
        && let Some(record) = load_shop_session(&state, &session).await
        && record.shop.as_str() != shop
    {
        tracing::info!(
            requested = %shop,
            signed_in = %record.shop,
            "request targets a different shop, forcing re-login"
        );
        clear_shop_session(&session).await;
        return redirect_to_login(&state, &session, request, Some(shop.as_str())).await;
    }

    next.run(request).await
}

/// Resolve the cookie-session reference to a stored shop session.
///
/// A reference that no longer resolves (expired row, store hiccup) is
/// treated as "not signed in" - the caller redirects to login, which is
/// the only recovery there is.
async fn load_shop_session(state: &AppState, session: &Session) -> Option<ShopSession> {
    let id = session
        .get::<Uuid>(session_keys::SHOP_SESSION)
        .await
        .ok()
        .flatten()?;

    match state.sessions().retrieve(id).await {
        Ok(found) => found,
        Err(e) => {
            tracing::error!(session_id = %id, "failed to retrieve shop session: {e}");
            None
        }
    }
}

/// Remove the session reference and the cached shop domain.
pub async fn clear_shop_session(session: &Session) {
    let _ = session.remove::<Uuid>(session_keys::SHOP_SESSION).await;
    let _ = session.remove::<String>(session_keys::SHOP_DOMAIN).await;
}

/// Send an unauthenticated request into the login flow.
///
/// XHR callers get a bare 401 - a redirect would be followed invisibly by
/// the browser's fetch layer and render the login page into some JSON
/// consumer. For navigations, a GET request's path is kept as the
/// post-login return target.
pub async fn redirect_to_login(
    state: &AppState,
    session: &Session,
    request: Request,
    shop: Option<&str>,
) -> Response {
    if is_xhr(request.headers()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    if request.method() == Method::GET
        && let Some(path_and_query) = request.uri().path_and_query()
        && let Err(e) = session
            .insert(session_keys::RETURN_TO, path_and_query.as_str())
            .await
    {
        tracing::warn!("failed to store return path: {e}");
    }

    Redirect::to(&state.config().login_url(shop)).into_response()
}

/// Drop a dead session and send the merchant back to login.
///
/// Used when the upstream rejects the stored credentials: the session
/// reference points at a token that no longer works, so keeping it would
/// loop the merchant through the same failure.
pub async fn close_session(state: &AppState, session: &Session, shop: Option<&str>) -> Response {
    clear_shop_session(session).await;
    Redirect::to(&state.config().login_url(shop)).into_response()
}

/// Redirect the whole page, not just the iframe.
///
/// Embedded mode cannot use an HTTP redirect for cross-origin targets: the
/// response would navigate the iframe, and the OAuth endpoints refuse to
/// render framed. Instead a small inline script escapes the frame - by
/// assigning `window.top.location` when the app somehow runs as the top
/// window, or by relaying the target to the admin chrome via `postMessage`
/// with the shop's origin as the message target.
///
/// Without a shop to scope the message origin to (and outside embedded
/// mode) this is a plain redirect.
pub fn fullpage_redirect_to(state: &AppState, shop: Option<&ShopDomain>, url: &str) -> Response {
    if !state.config().embedded {
        return Redirect::to(url).into_response();
    }

    match shop {
        Some(shop) => RedirectionTemplate::new(url, shop).into_response(),
        None => Redirect::to(url).into_response(),
    }
}

/// Inline script performing a top-level navigation from inside the iframe.
#[derive(Template, WebTemplate)]
#[template(path = "redirect.html")]
pub struct RedirectionTemplate {
    /// JSON-encoded target URL, safe to splice into the script.
    url: String,
    /// JSON-encoded target origin for the `postMessage` relay.
    origin: String,
}

impl RedirectionTemplate {
    fn new(url: &str, shop: &ShopDomain) -> Self {
        Self {
            url: serde_json::Value::String(url.to_owned()).to_string(),
            origin: serde_json::Value::String(shop.origin()).to_string(),
        }
    }
}

/// Extract the first scalar `shop` query parameter, decoded.
fn shop_query_param(uri: &Uri) -> Option<String> {
    let query = uri.query()?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "shop")
        .map(|(_, value)| value.into_owned())
}

/// Whether the request came from a browser XHR layer.
fn is_xhr(headers: &HeaderMap) -> bool {
    headers
        .get(REQUESTED_WITH_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("xmlhttprequest"))
}

// =============================================================================
// Handler-facing extractor
// =============================================================================

/// Extractor handing a gated handler its activated session.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentShop(shop): CurrentShop) -> Result<Json<ShopInfo>, AppError> {
///     Ok(Json(shop.get_shop().await?))
/// }
/// ```
pub struct CurrentShop(pub ActiveSession);

impl<S> FromRequestParts<S> for CurrentShop
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<ActiveSession>().cloned().map_or_else(
            || {
                tracing::warn!("CurrentShop used on a route without the session gate");
                Err(StatusCode::UNAUTHORIZED)
            },
            |active| Ok(Self(active)),
        )
    }
}
