//! OAuth handshake helpers.
//!
//! Shopify's install/login flow: send the merchant to the shop's
//! `/admin/oauth/authorize` page, get called back with a `code` plus an
//! HMAC signature over the query string, verify the signature, and exchange
//! the code for an offline access token.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use url::form_urlencoded;

use saltline_core::ShopDomain;

use super::ShopifyError;

type HmacSha256 = Hmac<Sha256>;

/// Build the authorization URL for a shop.
#[must_use]
pub fn authorize_url(
    shop: &ShopDomain,
    api_key: &str,
    scopes: &str,
    redirect_uri: &str,
    state: &str,
) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", api_key)
        .append_pair("scope", scopes)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("state", state)
        .finish();

    format!("https://{shop}/admin/oauth/authorize?{query}")
}

/// Verify the `hmac` parameter on an OAuth callback query string.
///
/// Per Shopify's scheme: drop the `hmac` parameter itself, sort the
/// remaining decoded `key=value` pairs, join them with `&`, and compare the
/// hex-encoded HMAC-SHA256 of that message (keyed with the app's API
/// secret) against the provided signature.
///
/// # Errors
///
/// Returns [`ShopifyError::InvalidHmac`] when the parameter is absent,
/// malformed, or does not match.
pub fn verify_hmac(raw_query: &str, api_secret: &SecretString) -> Result<(), ShopifyError> {
    let mut provided = None;
    let mut pairs: Vec<(String, String)> = Vec::new();

    for (key, value) in form_urlencoded::parse(raw_query.as_bytes()) {
        if key == "hmac" {
            provided = Some(value.into_owned());
        } else {
            pairs.push((key.into_owned(), value.into_owned()));
        }
    }

    let provided = provided.ok_or(ShopifyError::InvalidHmac)?;
    let signature = hex::decode(provided).map_err(|_| ShopifyError::InvalidHmac)?;

    pairs.sort();
    let message = pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut mac = HmacSha256::new_from_slice(api_secret.expose_secret().as_bytes())
        .map_err(|_| ShopifyError::InvalidHmac)?;
    mac.update(message.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| ShopifyError::InvalidHmac)
}
