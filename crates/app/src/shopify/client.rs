//! Admin API client with request-scoped session activation.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::StatusCode;
use reqwest::header::HeaderValue;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use saltline_core::{AccessToken, ShopDomain};

use crate::config::ShopifyConfig;
use crate::models::ShopSession;

use super::{ShopifyError, oauth};

/// Header carrying the Admin API access token.
const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Shopify Admin API client.
///
/// Cheap to clone; all clones share one HTTP connection pool and one
/// activation counter. The client itself is shop-agnostic - API calls are
/// made through the [`ActiveSession`] returned by [`Self::activate`].
#[derive(Clone)]
pub struct ShopifyClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    config: ShopifyConfig,
    /// Number of live [`ActiveSession`] guards.
    active: AtomicUsize,
}

impl ShopifyClient {
    /// Create a new Admin API client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: ShopifyConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(ClientInner {
                http,
                config,
                active: AtomicUsize::new(0),
            }),
        }
    }

    /// Activate a stored session for the scope of one request.
    ///
    /// The returned guard authenticates API calls for the session's shop.
    /// When the last clone of the guard drops - handler done, handler
    /// errored, or stack unwinding - the activation is released.
    #[must_use]
    pub fn activate(&self, session: &ShopSession) -> ActiveSession {
        self.inner.active.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(shop = %session.shop, "api session activated");

        ActiveSession {
            inner: Arc::new(ActiveSessionInner {
                client: self.clone(),
                shop: session.shop.clone(),
                token: session.access_token.clone(),
            }),
        }
    }

    /// Number of currently live activations.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Build the OAuth authorization URL a merchant is sent to at install
    /// or login time.
    #[must_use]
    pub fn authorize_url(&self, shop: &ShopDomain, redirect_uri: &str, state: &str) -> String {
        oauth::authorize_url(
            shop,
            &self.inner.config.api_key,
            &self.inner.config.scopes,
            redirect_uri,
            state,
        )
    }

    /// Verify the HMAC signature Shopify puts on OAuth callback requests.
    ///
    /// # Errors
    ///
    /// Returns [`ShopifyError::InvalidHmac`] if the signature is missing or
    /// does not match.
    pub fn verify_callback(&self, raw_query: &str) -> Result<(), ShopifyError> {
        oauth::verify_hmac(raw_query, &self.inner.config.api_secret)
    }

    /// Exchange an OAuth authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns [`ShopifyError::OAuth`] if the shop rejects the code, or
    /// [`ShopifyError::Http`] on transport failure.
    #[instrument(skip(self, code), fields(shop = %shop))]
    pub async fn exchange_code(
        &self,
        shop: &ShopDomain,
        code: &str,
    ) -> Result<ExchangedToken, ShopifyError> {
        #[derive(Serialize)]
        struct ExchangeRequest<'a> {
            client_id: &'a str,
            client_secret: &'a str,
            code: &'a str,
        }

        #[derive(Deserialize)]
        struct ExchangeResponse {
            access_token: String,
            #[serde(default)]
            scope: String,
        }

        let url = format!("https://{shop}/admin/oauth/access_token");
        let response = self
            .inner
            .http
            .post(url)
            .json(&ExchangeRequest {
                client_id: &self.inner.config.api_key,
                client_secret: self.inner.config.api_secret.expose_secret(),
                code,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ShopifyError::OAuth(format!(
                "shop answered {status} to the code exchange"
            )));
        }

        let exchanged: ExchangeResponse = response.json().await?;
        Ok(ExchangedToken {
            access_token: AccessToken::new(exchanged.access_token),
            scope: exchanged.scope,
        })
    }

    fn release(&self) {
        self.inner.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for ShopifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyClient")
            .field("config", &self.inner.config)
            .field("active", &self.active_sessions())
            .finish()
    }
}

/// Result of a successful OAuth code exchange.
#[derive(Debug, Clone)]
pub struct ExchangedToken {
    /// Offline access token for the shop.
    pub access_token: AccessToken,
    /// Scopes the merchant actually granted.
    pub scope: String,
}

// =============================================================================
// Active session guard
// =============================================================================

/// A request-scoped activation of a stored session.
///
/// Clones share one activation; the count drops when the last clone does.
/// Handlers receive one through request extensions (see
/// [`crate::middleware::session_gate::CurrentShop`]).
#[derive(Clone)]
pub struct ActiveSession {
    inner: Arc<ActiveSessionInner>,
}

struct ActiveSessionInner {
    client: ShopifyClient,
    shop: ShopDomain,
    token: AccessToken,
}

impl Drop for ActiveSessionInner {
    fn drop(&mut self) {
        self.client.release();
        tracing::debug!(shop = %self.shop, "api session deactivated");
    }
}

impl ActiveSession {
    /// The shop this activation is scoped to.
    #[must_use]
    pub fn shop(&self) -> &ShopDomain {
        &self.inner.shop
    }

    /// Fetch the shop resource for the activated shop.
    ///
    /// # Errors
    ///
    /// Returns [`ShopifyError::Unauthorized`] if the shop rejects the
    /// stored token (401/403), [`ShopifyError::UnexpectedStatus`] for other
    /// non-success answers, and [`ShopifyError::Http`] on transport errors.
    #[instrument(skip(self), fields(shop = %self.inner.shop))]
    pub async fn get_shop(&self) -> Result<ShopInfo, ShopifyError> {
        #[derive(Deserialize)]
        struct ShopEnvelope {
            shop: ShopInfo,
        }

        let url = format!(
            "https://{}/admin/api/{}/shop.json",
            self.inner.shop,
            self.inner.client.inner.config.api_version
        );

        let response = self
            .inner
            .client
            .inner
            .http
            .get(url)
            .header(
                ACCESS_TOKEN_HEADER,
                HeaderValue::from_str(self.inner.token.as_str())
                    .map_err(|_| ShopifyError::Unauthorized)?,
            )
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let envelope: ShopEnvelope = response.json().await?;
                Ok(envelope.shop)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ShopifyError::Unauthorized),
            status => Err(ShopifyError::UnexpectedStatus { status }),
        }
    }
}

impl std::fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSession")
            .field("shop", &self.inner.shop)
            .finish()
    }
}

/// Shop resource returned by the Admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopInfo {
    /// Display name of the shop.
    pub name: String,
    /// Contact email, when exposed.
    #[serde(default)]
    pub email: Option<String>,
    /// Primary storefront domain.
    #[serde(default)]
    pub domain: Option<String>,
    /// Billing plan name.
    #[serde(default)]
    pub plan_name: Option<String>,
    /// Shop currency code.
    #[serde(default)]
    pub currency: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn test_client() -> ShopifyClient {
        ShopifyClient::new(ShopifyConfig {
            api_key: "test_api_key".to_string(),
            api_secret: SecretString::from("test_api_secret"),
            scopes: "read_products".to_string(),
            api_version: "2026-01".to_string(),
        })
    }

    fn test_session() -> ShopSession {
        ShopSession::new(
            ShopDomain::parse("driftwood-supply").unwrap(),
            AccessToken::new("shpat_test".to_string()),
            "read_products".to_string(),
        )
    }

    #[test]
    fn test_activation_is_counted() {
        let client = test_client();
        assert_eq!(client.active_sessions(), 0);

        let active = client.activate(&test_session());
        assert_eq!(client.active_sessions(), 1);

        drop(active);
        assert_eq!(client.active_sessions(), 0);
    }

    #[test]
    fn test_clones_share_one_activation() {
        let client = test_client();
        let active = client.activate(&test_session());
        let clone = active.clone();

        assert_eq!(client.active_sessions(), 1);
        drop(active);
        assert_eq!(client.active_sessions(), 1);
        drop(clone);
        assert_eq!(client.active_sessions(), 0);
    }

    #[test]
    fn test_activation_released_on_unwind() {
        let client = test_client();
        let session = test_session();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _active = client.activate(&session);
            panic!("handler blew up");
        }));

        assert!(result.is_err());
        assert_eq!(client.active_sessions(), 0);
    }

    #[test]
    fn test_authorize_url_contains_oauth_params() {
        let client = test_client();
        let shop = ShopDomain::parse("driftwood-supply").unwrap();
        let url = client.authorize_url(&shop, "https://app.example.com/auth/callback", "nonce123");

        assert!(url.starts_with("https://driftwood-supply.myshopify.com/admin/oauth/authorize?"));
        assert!(url.contains("client_id=test_api_key"));
        assert!(url.contains("scope=read_products"));
        assert!(url.contains("state=nonce123"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Fauth%2Fcallback"));
    }
}
