//! Back-office order list and status changes.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::form_urlencoded;

use tienda_core::{OrderId, OrderStatus};

use crate::error::{ApiResult, AppError};
use crate::filters;
use crate::middleware::{CspNonce, RequireStaff, Shopper};
use crate::models::listing::{DEFAULT_PAGE_SIZE, Page};
use crate::models::order::Order;
use crate::routes::Layout;
use crate::routes::orders::OrderView;
use crate::services::FieldErrors;
use crate::state::AppState;

/// Order list query: `?status=pending&page=2`.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Status filter option.
#[derive(Clone)]
pub struct StatusOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Orders page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct AdminOrdersTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderView>,
    pub statuses: Vec<StatusOption>,
    pub page: u32,
    pub total_pages: u32,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

/// Status change body.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// `{ok, status}`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ok: bool,
    pub status: &'static str,
}

/// An unknown or blank status filter shows every order.
fn parse_status_filter(raw: Option<&str>) -> Option<OrderStatus> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
}

fn page_url(status: Option<OrderStatus>, page: u32) -> String {
    let mut params = form_urlencoded::Serializer::new(String::new());
    if let Some(status) = status {
        params.append_pair("status", status.as_str());
    }
    params.append_pair("page", &page.to_string());
    format!("/admin/orders?{}", params.finish())
}

/// Display orders, newest first.
#[instrument(skip(state, shopper, nonce, _staff))]
pub async fn index(
    State(state): State<AppState>,
    _staff: RequireStaff,
    shopper: Shopper,
    nonce: CspNonce,
    Query(query): Query<OrderListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = parse_status_filter(query.status.as_deref());
    let page: Page<Order> = state
        .orders()
        .list(
            status,
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    let currency = state.config().shop.currency;

    Ok(AdminOrdersTemplate {
        layout: Layout::build(&state, &shopper, nonce).await?,
        orders: page
            .items
            .iter()
            .map(|o| OrderView::new(o, currency))
            .collect(),
        statuses: OrderStatus::ALL
            .into_iter()
            .map(|s| StatusOption {
                value: s.as_str(),
                label: s.label(),
                selected: Some(s) == status,
            })
            .collect(),
        page: page.page,
        total_pages: page.total_pages(),
        prev_url: page.has_previous().then(|| page_url(status, page.page - 1)),
        next_url: page.has_next().then(|| page_url(status, page.page + 1)),
    })
}

/// Change an order's status.
#[instrument(skip(state, staff), fields(user_id = %staff.0.id))]
pub async fn update_status(
    State(state): State<AppState>,
    staff: RequireStaff,
    Path(id): Path<i32>,
    Json(form): Json<StatusForm>,
) -> ApiResult<Json<StatusResponse>> {
    let next: OrderStatus = form
        .status
        .parse()
        .map_err(|e: String| AppError::Validation(FieldErrors::single("status", e)))?;

    let order = state
        .orders()
        .update_status(OrderId::new(id), next, staff.0.id)
        .await?;

    Ok(Json(StatusResponse {
        ok: true,
        status: order.status.as_str(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_ignores_unknown_values() {
        assert_eq!(
            parse_status_filter(Some("ready_for_pickup")),
            Some(OrderStatus::ReadyForPickup)
        );
        assert_eq!(parse_status_filter(Some("")), None);
        assert_eq!(parse_status_filter(Some("shipped")), None);
        assert_eq!(parse_status_filter(None), None);
    }

    #[test]
    fn page_url_keeps_status() {
        assert_eq!(
            page_url(Some(OrderStatus::Pending), 3),
            "/admin/orders?status=pending&page=3"
        );
        assert_eq!(page_url(None, 1), "/admin/orders?page=1");
    }
}
