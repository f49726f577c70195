//! Back-office category and tag management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tienda_core::{CategoryId, TagId};

use super::{ActiveForm, ActiveResponse, NameForm};
use crate::error::{ApiResult, AppError};
use crate::filters;
use crate::middleware::{CspNonce, RequireStaff, Shopper};
use crate::models::catalog::{Category, CategoryWithTags, Tag};
use crate::routes::Layout;
use crate::state::AppState;

/// Categories and tags page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/tags.html")]
pub struct AdminTagsTemplate {
    pub layout: Layout,
    pub taxonomy: Vec<CategoryWithTags>,
}

/// Tag creation body.
#[derive(Debug, Deserialize)]
pub struct NewTagForm {
    pub category_id: i32,
    pub name: String,
}

/// `{ok, category}`.
#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub ok: bool,
    pub category: Category,
}

/// `{ok, tag}`.
#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub ok: bool,
    pub tag: Tag,
}

/// Display every category with its tags, active or not.
#[instrument(skip(state, shopper, nonce, _staff))]
pub async fn index(
    State(state): State<AppState>,
    _staff: RequireStaff,
    shopper: Shopper,
    nonce: CspNonce,
) -> Result<impl IntoResponse, AppError> {
    Ok(AdminTagsTemplate {
        layout: Layout::build(&state, &shopper, nonce).await?,
        taxonomy: state.catalog().admin_taxonomy().await?,
    })
}

/// Create a category.
#[instrument(skip(state, staff), fields(user_id = %staff.0.id))]
pub async fn create_category(
    State(state): State<AppState>,
    staff: RequireStaff,
    Json(form): Json<NameForm>,
) -> ApiResult<Json<CategoryResponse>> {
    let category = state.catalog().create_category(&form.name).await?;
    Ok(Json(CategoryResponse { ok: true, category }))
}

/// Rename a category.
#[instrument(skip(state, staff), fields(user_id = %staff.0.id))]
pub async fn rename_category(
    State(state): State<AppState>,
    staff: RequireStaff,
    Path(id): Path<i32>,
    Json(form): Json<NameForm>,
) -> ApiResult<Json<CategoryResponse>> {
    let category = state
        .catalog()
        .rename_category(CategoryId::new(id), &form.name)
        .await?;
    Ok(Json(CategoryResponse { ok: true, category }))
}

/// Deactivate or reactivate a category.
#[instrument(skip(state, staff), fields(user_id = %staff.0.id))]
pub async fn set_category_active(
    State(state): State<AppState>,
    staff: RequireStaff,
    Path(id): Path<i32>,
    Json(form): Json<ActiveForm>,
) -> ApiResult<Json<ActiveResponse>> {
    state
        .catalog()
        .set_category_active(CategoryId::new(id), form.active)
        .await?;
    Ok(Json(ActiveResponse::new(form.active)))
}

/// Create a tag in a category.
#[instrument(skip(state, staff), fields(user_id = %staff.0.id))]
pub async fn create_tag(
    State(state): State<AppState>,
    staff: RequireStaff,
    Json(form): Json<NewTagForm>,
) -> ApiResult<Json<TagResponse>> {
    let tag = state
        .catalog()
        .create_tag(CategoryId::new(form.category_id), &form.name)
        .await?;
    Ok(Json(TagResponse { ok: true, tag }))
}

/// Rename a tag.
#[instrument(skip(state, staff), fields(user_id = %staff.0.id))]
pub async fn rename_tag(
    State(state): State<AppState>,
    staff: RequireStaff,
    Path(id): Path<i32>,
    Json(form): Json<NameForm>,
) -> ApiResult<Json<TagResponse>> {
    let tag = state
        .catalog()
        .rename_tag(TagId::new(id), &form.name)
        .await?;
    Ok(Json(TagResponse { ok: true, tag }))
}

/// Deactivate or reactivate a tag.
#[instrument(skip(state, staff), fields(user_id = %staff.0.id))]
pub async fn set_tag_active(
    State(state): State<AppState>,
    staff: RequireStaff,
    Path(id): Path<i32>,
    Json(form): Json<ActiveForm>,
) -> ApiResult<Json<ActiveResponse>> {
    state
        .catalog()
        .set_tag_active(TagId::new(id), form.active)
        .await?;
    Ok(Json(ActiveResponse::new(form.active)))
}
