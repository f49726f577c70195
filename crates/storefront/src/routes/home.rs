//! Home page route handler.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use super::Layout;
use super::products::ProductView;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{CspNonce, Shopper};
use crate::models::catalog::CategoryWithTags;
use crate::state::AppState;

/// Number of newest products featured on the home page.
const FEATURED_COUNT: i64 = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub featured: Vec<ProductView>,
    pub nav: Arc<Vec<CategoryWithTags>>,
    pub free_shipping_from: String,
}

/// Display the home page: newest products and the taxonomy navigation.
#[instrument(skip(state, shopper, nonce))]
pub async fn home(
    State(state): State<AppState>,
    shopper: Shopper,
    nonce: CspNonce,
) -> Result<impl IntoResponse, AppError> {
    let catalog = state.catalog();
    let shop = &state.config().shop;

    let featured = catalog
        .featured(FEATURED_COUNT)
        .await?
        .iter()
        .map(|p| ProductView::from_product(p, shop.currency))
        .collect();

    Ok(HomeTemplate {
        layout: Layout::build(&state, &shopper, nonce).await?,
        featured,
        nav: catalog.navigation().await?,
        free_shipping_from: super::format_money(shop.currency, shop.free_shipping_threshold),
    })
}
