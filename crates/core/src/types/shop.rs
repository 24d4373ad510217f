//! Shop domain type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ShopDomain`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShopDomainError {
    /// The input string is empty (or whitespace only).
    #[error("shop domain cannot be empty")]
    Empty,
    /// The input is too long to be a valid hostname.
    #[error("shop domain must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The domain does not end in `.myshopify.com`.
    #[error("shop domain must end in .myshopify.com")]
    WrongSuffix,
    /// The store name contains characters outside `[a-z0-9-]` or starts
    /// with a hyphen.
    #[error("shop domain contains invalid characters")]
    InvalidCharacters,
}

/// A merchant's `*.myshopify.com` domain.
///
/// The shop domain is the tenant identifier for a merchant account. It
/// arrives from the outside world as a query parameter on almost every
/// request, so it is parsed defensively: anything that is not a plain
/// `<store>.myshopify.com` hostname is rejected. The parsed value is safe
/// to embed in URLs and in `postMessage` target origins.
///
/// ## Constraints
///
/// - A bare store handle (`driftwood-supply`) is accepted and normalized
///   to `driftwood-supply.myshopify.com`
/// - Uppercase input is lowercased
/// - The store name must match `[a-z0-9][a-z0-9-]*`
/// - Total length is capped at 255 characters (hostname limit)
///
/// ## Examples
///
/// ```
/// use saltline_core::ShopDomain;
///
/// // Valid shops
/// assert!(ShopDomain::parse("driftwood-supply.myshopify.com").is_ok());
/// assert!(ShopDomain::parse("Driftwood-Supply.MYSHOPIFY.com").is_ok());
/// assert!(ShopDomain::parse("driftwood-supply").is_ok()); // bare handle
///
/// // Invalid shops
/// assert!(ShopDomain::parse("").is_err());
/// assert!(ShopDomain::parse("evil.com").is_err());
/// assert!(ShopDomain::parse("shop.myshopify.com.evil.com").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ShopDomain(String);

/// Suffix shared by every shop domain.
const MYSHOPIFY_SUFFIX: &str = ".myshopify.com";

impl ShopDomain {
    /// Maximum length of a shop domain (DNS hostname limit).
    pub const MAX_LENGTH: usize = 255;

    /// Parse a `ShopDomain` from an untrusted string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input:
    /// - Is empty or whitespace only
    /// - Is longer than 255 characters
    /// - Contains a dot but does not end in `.myshopify.com`
    /// - Has a store name outside `[a-z0-9][a-z0-9-]*`
    pub fn parse(input: &str) -> Result<Self, ShopDomainError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ShopDomainError::Empty);
        }

        let mut domain = trimmed.to_ascii_lowercase();

        // A bare store handle is allowed as shorthand for the full domain.
        if !domain.contains('.') {
            domain.push_str(MYSHOPIFY_SUFFIX);
        }

        if domain.len() > Self::MAX_LENGTH {
            return Err(ShopDomainError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let store = domain
            .strip_suffix(MYSHOPIFY_SUFFIX)
            .ok_or(ShopDomainError::WrongSuffix)?;

        if store.is_empty() {
            return Err(ShopDomainError::Empty);
        }

        // The store name is a single DNS label: no dots, no scheme or
        // userinfo characters, nothing that could smuggle a different host
        // into a URL or an origin string.
        let mut chars = store.chars();
        let first_is_valid = chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        if !first_is_valid {
            return Err(ShopDomainError::InvalidCharacters);
        }
        if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
            return Err(ShopDomainError::InvalidCharacters);
        }

        Ok(Self(domain))
    }

    /// Returns the shop domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `ShopDomain` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns the shop's web origin, e.g. `https://store.myshopify.com`.
    ///
    /// This is the value used as the target origin of the embedded-app
    /// `postMessage` relay.
    #[must_use]
    pub fn origin(&self) -> String {
        format!("https://{}", self.0)
    }

    /// Returns the store handle without the `.myshopify.com` suffix.
    #[must_use]
    pub fn store_handle(&self) -> &str {
        self.0.strip_suffix(MYSHOPIFY_SUFFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl core::str::FromStr for ShopDomain {
    type Err = ShopDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_domain() {
        let shop = ShopDomain::parse("driftwood-supply.myshopify.com").unwrap();
        assert_eq!(shop.as_str(), "driftwood-supply.myshopify.com");
        assert_eq!(shop.store_handle(), "driftwood-supply");
    }

    #[test]
    fn test_parse_bare_handle_is_normalized() {
        let shop = ShopDomain::parse("driftwood-supply").unwrap();
        assert_eq!(shop.as_str(), "driftwood-supply.myshopify.com");
    }

    #[test]
    fn test_parse_lowercases_and_trims() {
        let shop = ShopDomain::parse("  Driftwood-Supply.MyShopify.Com  ").unwrap();
        assert_eq!(shop.as_str(), "driftwood-supply.myshopify.com");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(ShopDomain::parse(""), Err(ShopDomainError::Empty));
        assert_eq!(ShopDomain::parse("   "), Err(ShopDomainError::Empty));
        assert_eq!(
            ShopDomain::parse(".myshopify.com"),
            Err(ShopDomainError::Empty)
        );
    }

    #[test]
    fn test_parse_rejects_foreign_domains() {
        assert_eq!(
            ShopDomain::parse("evil.com"),
            Err(ShopDomainError::WrongSuffix)
        );
        assert_eq!(
            ShopDomain::parse("shop.myshopify.com.evil.com"),
            Err(ShopDomainError::WrongSuffix)
        );
    }

    #[test]
    fn test_parse_rejects_subdomain_smuggling() {
        // A dotted store name would change which host the origin points at.
        assert_eq!(
            ShopDomain::parse("a.b.myshopify.com"),
            Err(ShopDomainError::InvalidCharacters)
        );
    }

    #[test]
    fn test_parse_rejects_url_metacharacters() {
        for input in [
            "shop%2f.myshopify.com",
            "shop/../x.myshopify.com",
            "shop:8080.myshopify.com",
            "user@shop.myshopify.com",
            "shop name.myshopify.com",
        ] {
            assert_eq!(
                ShopDomain::parse(input),
                Err(ShopDomainError::InvalidCharacters),
                "should reject {input:?}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_leading_hyphen() {
        assert_eq!(
            ShopDomain::parse("-shop.myshopify.com"),
            Err(ShopDomainError::InvalidCharacters)
        );
    }

    #[test]
    fn test_parse_rejects_too_long() {
        let input = format!("{}.myshopify.com", "a".repeat(300));
        assert!(matches!(
            ShopDomain::parse(&input),
            Err(ShopDomainError::TooLong { .. })
        ));
    }

    #[test]
    fn test_origin() {
        let shop = ShopDomain::parse("driftwood-supply").unwrap();
        assert_eq!(shop.origin(), "https://driftwood-supply.myshopify.com");
    }

    #[test]
    fn test_serde_round_trip() {
        let shop = ShopDomain::parse("driftwood-supply").unwrap();
        let json = serde_json::to_string(&shop).unwrap();
        assert_eq!(json, "\"driftwood-supply.myshopify.com\"");
        let back: ShopDomain = serde_json::from_str(&json).unwrap();
        assert_eq!(back, shop);
    }
}
