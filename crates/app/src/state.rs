//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::sessions::ShopSessionStore;
use crate::shopify::ShopifyClient;

/// Application state shared across all handlers.
///
/// Cheap to clone; all clones share one inner allocation.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    sessions: Arc<dyn ShopSessionStore>,
    shopify: ShopifyClient,
}

impl AppState {
    /// Build the state from its collaborators.
    #[must_use]
    pub fn new(config: AppConfig, sessions: Arc<dyn ShopSessionStore>) -> Self {
        let shopify = ShopifyClient::new(config.shopify.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                sessions,
                shopify,
            }),
        }
    }

    /// Application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Shop session store.
    #[must_use]
    pub fn sessions(&self) -> &Arc<dyn ShopSessionStore> {
        &self.inner.sessions
    }

    /// Upstream Admin API client.
    #[must_use]
    pub fn shopify(&self) -> &ShopifyClient {
        &self.inner.shopify
    }
}
