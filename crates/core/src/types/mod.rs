//! Newtype wrappers shared across Saltline crates.
//!
//! - [`ShopDomain`] - validated `*.myshopify.com` tenant domain
//! - [`AccessToken`] - opaque Admin API credential with redacted `Debug`

mod shop;
mod token;

pub use shop::{ShopDomain, ShopDomainError};
pub use token::AccessToken;
