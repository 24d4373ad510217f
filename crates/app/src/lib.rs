//! Saltline - embedded Shopify admin app.
//!
//! This crate provides the app as a library, allowing the HTTP surface to
//! be exercised by the integration tests without a running binary.
//!
//! # Architecture
//!
//! - Axum web framework
//! - tower-sessions cookie sessions (`PostgreSQL`-backed in production)
//! - Session gate middleware activating stored Admin API sessions per request
//! - Askama templates for server-side rendering, including the inline
//!   full-page redirect script embedded mode needs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod sessions;
pub mod shopify;
pub mod state;

