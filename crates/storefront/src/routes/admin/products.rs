//! Back-office product management.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tienda_core::{CurrencyCode, LinkChanges, ProductId, Size, TagId};

use super::{ActiveForm, ActiveResponse};
use crate::error::{ApiResult, AppError};
use crate::filters;
use crate::middleware::{CspNonce, RequireStaff, Shopper};
use crate::models::catalog::{CategoryWithTags, Product, ProductDetail};
use crate::routes::{Layout, format_money};
use crate::services::catalog::ProductForm;
use crate::state::AppState;

/// Product row for the back-office list.
#[derive(Clone)]
pub struct AdminProductView {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Plain decimal for the edit form.
    pub base_price: String,
    pub price: String,
    pub image_url: String,
    pub is_active: bool,
    pub sizes: Vec<&'static str>,
    pub tag_ids: Vec<i32>,
    pub tag_names: String,
}

impl AdminProductView {
    fn new(detail: &ProductDetail, currency: CurrencyCode) -> Self {
        let product = &detail.product;
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            slug: product.slug.clone(),
            description: product.description.clone(),
            base_price: product.base_price.to_string(),
            price: format_money(currency, product.base_price),
            image_url: product.image_url.clone().unwrap_or_default(),
            is_active: product.is_active,
            sizes: detail.sizes.iter().map(|s| s.as_str()).collect(),
            tag_ids: detail.tags.iter().map(|t| t.id.as_i32()).collect(),
            tag_names: detail
                .tags
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    #[must_use]
    pub fn has_size(&self, size: &str) -> bool {
        self.sizes.iter().any(|s| *s == size)
    }

    #[must_use]
    pub fn has_tag(&self, tag_id: i32) -> bool {
        self.tag_ids.contains(&tag_id)
    }
}

/// Product list page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct AdminProductsTemplate {
    pub layout: Layout,
    pub products: Vec<AdminProductView>,
    pub all_sizes: Vec<&'static str>,
    pub taxonomy: Arc<Vec<CategoryWithTags>>,
}

/// `{ok, product}`.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub ok: bool,
    pub product: Product,
}

/// Tag-set replacement body.
#[derive(Debug, Deserialize)]
pub struct TagsForm {
    pub tag_ids: Vec<i32>,
}

/// Size-set replacement body.
#[derive(Debug, Deserialize)]
pub struct SizesForm {
    pub sizes: Vec<String>,
}

/// `{ok, deactivated, reactivated, inserted}` after a set replacement.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LinksResponse {
    pub ok: bool,
    pub deactivated: usize,
    pub reactivated: usize,
    pub inserted: usize,
}

impl<K> From<&LinkChanges<K>> for LinksResponse {
    fn from(changes: &LinkChanges<K>) -> Self {
        Self {
            ok: true,
            deactivated: changes.deactivate.len(),
            reactivated: changes.reactivate.len(),
            inserted: changes.insert.len(),
        }
    }
}

/// Display every product, active or not.
#[instrument(skip(state, shopper, nonce, _staff))]
pub async fn index(
    State(state): State<AppState>,
    _staff: RequireStaff,
    shopper: Shopper,
    nonce: CspNonce,
) -> Result<impl IntoResponse, AppError> {
    let catalog = state.catalog();
    let currency = state.config().shop.currency;

    let products = catalog
        .admin_products()
        .await?
        .iter()
        .map(|d| AdminProductView::new(d, currency))
        .collect();

    Ok(AdminProductsTemplate {
        layout: Layout::build(&state, &shopper, nonce).await?,
        products,
        all_sizes: Size::ALL.into_iter().map(Size::as_str).collect(),
        taxonomy: catalog.navigation().await?,
    })
}

/// Create a product.
#[instrument(skip(state, staff, form), fields(user_id = %staff.0.id))]
pub async fn create(
    State(state): State<AppState>,
    staff: RequireStaff,
    Json(form): Json<ProductForm>,
) -> ApiResult<Json<ProductResponse>> {
    let product = state.catalog().create_product(&form).await?;
    Ok(Json(ProductResponse { ok: true, product }))
}

/// Update a product.
#[instrument(skip(state, staff, form), fields(user_id = %staff.0.id))]
pub async fn update(
    State(state): State<AppState>,
    staff: RequireStaff,
    Path(id): Path<i32>,
    Json(form): Json<ProductForm>,
) -> ApiResult<Json<ProductResponse>> {
    let product = state
        .catalog()
        .update_product(ProductId::new(id), &form)
        .await?;
    Ok(Json(ProductResponse { ok: true, product }))
}

/// Deactivate or reactivate a product.
#[instrument(skip(state, staff), fields(user_id = %staff.0.id))]
pub async fn set_active(
    State(state): State<AppState>,
    staff: RequireStaff,
    Path(id): Path<i32>,
    Json(form): Json<ActiveForm>,
) -> ApiResult<Json<ActiveResponse>> {
    state
        .catalog()
        .set_product_active(ProductId::new(id), form.active)
        .await?;
    tracing::info!(product_id = id, active = form.active, "Product visibility changed");
    Ok(Json(ActiveResponse::new(form.active)))
}

/// Replace a product's tag set.
#[instrument(skip(state, staff), fields(user_id = %staff.0.id))]
pub async fn replace_tags(
    State(state): State<AppState>,
    staff: RequireStaff,
    Path(id): Path<i32>,
    Json(form): Json<TagsForm>,
) -> ApiResult<Json<LinksResponse>> {
    let tag_ids: Vec<TagId> = form.tag_ids.into_iter().map(TagId::new).collect();
    let changes = state
        .catalog()
        .replace_tags(ProductId::new(id), &tag_ids)
        .await?;
    Ok(Json(LinksResponse::from(&changes)))
}

/// Replace a product's size set.
#[instrument(skip(state, staff), fields(user_id = %staff.0.id))]
pub async fn replace_sizes(
    State(state): State<AppState>,
    staff: RequireStaff,
    Path(id): Path<i32>,
    Json(form): Json<SizesForm>,
) -> ApiResult<Json<LinksResponse>> {
    let changes = state
        .catalog()
        .replace_sizes(ProductId::new(id), &form.sizes)
        .await?;
    Ok(Json(LinksResponse::from(&changes)))
}
