//! Gated pages and API routes.

use askama::Template;
use askama_web::WebTemplate;
use axum::Json;

use crate::error::AppError;
use crate::middleware::CurrentShop;
use crate::shopify::ShopInfo;

/// Home page showing the signed-in shop.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    /// Display name of the shop.
    pub shop_name: String,
    /// The shop's `*.myshopify.com` domain.
    pub shop_domain: String,
    /// Billing plan, when the API exposes it.
    pub plan_name: Option<String>,
    /// Shop currency code.
    pub currency: Option<String>,
}

/// Render the home page for the signed-in shop.
///
/// # Route
///
/// `GET /`
pub async fn home(CurrentShop(shop): CurrentShop) -> Result<HomeTemplate, AppError> {
    let info = shop.get_shop().await?;

    Ok(HomeTemplate {
        shop_name: info.name,
        shop_domain: shop.shop().to_string(),
        plan_name: info.plan_name,
        currency: info.currency,
    })
}

/// Shop resource as JSON, for the app's own frontend XHR calls.
///
/// # Route
///
/// `GET /api/shop`
pub async fn shop_info(CurrentShop(shop): CurrentShop) -> Result<Json<ShopInfo>, AppError> {
    Ok(Json(shop.get_shop().await?))
}
