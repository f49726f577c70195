//! Order history, ticket and customer cancellation handlers.
//!
//! Orders belong to the cart owner that placed them, so guests can see the
//! tickets of their own session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Serialize;
use tracing::instrument;

use tienda_core::{CurrencyCode, OrderId};

use super::{Layout, format_money};
use crate::error::{ApiResult, AppError};
use crate::filters;
use crate::middleware::{CspNonce, Shopper};
use crate::models::order::{Order, OrderDetail, StatusEvent};
use crate::state::AppState;

/// Order summary row for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: i32,
    pub ticket: String,
    pub status: &'static str,
    pub status_label: &'static str,
    pub placed_at: String,
    pub subtotal: String,
    pub shipping: String,
    pub total: String,
    pub shipping_address: Option<String>,
    pub can_cancel: bool,
}

impl OrderView {
    #[must_use]
    pub fn new(order: &Order, currency: CurrencyCode) -> Self {
        Self {
            id: order.id.as_i32(),
            ticket: order.ticket_code(),
            status: order.status.as_str(),
            status_label: order.status.label(),
            placed_at: order.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            subtotal: format_money(currency, order.subtotal),
            shipping: format_money(currency, order.shipping),
            total: format_money(currency, order.total),
            shipping_address: order.shipping_address.clone(),
            can_cancel: order.status.customer_can_cancel(),
        }
    }
}

/// Ticket line for templates.
#[derive(Clone)]
pub struct OrderItemView {
    pub name: String,
    pub size: &'static str,
    pub quantity: i32,
    pub price: String,
    pub line_price: String,
}

/// One step of a ticket's status timeline.
#[derive(Clone)]
pub struct StatusStepView {
    pub label: &'static str,
    pub at: String,
}

impl From<&StatusEvent> for StatusStepView {
    fn from(event: &StatusEvent) -> Self {
        Self {
            label: event.to_status.label(),
            at: event.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        }
    }
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderView>,
}

/// Ticket template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub layout: Layout,
    pub order: OrderView,
    pub items: Vec<OrderItemView>,
    pub timeline: Vec<StatusStepView>,
}

/// `{ok, status}` after a cancellation.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub ok: bool,
    pub status: &'static str,
}

/// Build the ticket view of an order.
#[must_use]
pub fn ticket_items(detail: &OrderDetail, currency: CurrencyCode) -> Vec<OrderItemView> {
    detail
        .items
        .iter()
        .map(|item| OrderItemView {
            name: item.product_name.clone(),
            size: item.size.as_str(),
            quantity: item.quantity,
            price: format_money(currency, item.unit_price),
            line_price: format_money(currency, item.line_total()),
        })
        .collect()
}

/// Display the visitor's orders, newest first.
#[instrument(skip(state, shopper, nonce))]
pub async fn index(
    State(state): State<AppState>,
    shopper: Shopper,
    nonce: CspNonce,
) -> Result<impl IntoResponse, AppError> {
    let currency = state.config().shop.currency;
    let orders = match shopper.owner().await? {
        Some(owner) => state.orders().for_owner(&owner).await?,
        None => Vec::new(),
    };

    Ok(OrdersIndexTemplate {
        layout: Layout::build(&state, &shopper, nonce).await?,
        orders: orders.iter().map(|o| OrderView::new(o, currency)).collect(),
    })
}

/// Display a ticket.
#[instrument(skip(state, shopper, nonce))]
pub async fn show(
    State(state): State<AppState>,
    shopper: Shopper,
    nonce: CspNonce,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let owner = shopper
        .owner()
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    let detail = state.orders().ticket(&owner, OrderId::new(id)).await?;
    let history = state.orders().history(detail.order.id).await?;
    let currency = state.config().shop.currency;

    Ok(OrderShowTemplate {
        layout: Layout::build(&state, &shopper, nonce).await?,
        order: OrderView::new(&detail.order, currency),
        items: ticket_items(&detail, currency),
        timeline: history.iter().map(StatusStepView::from).collect(),
    })
}

/// Cancel a pending order.
#[instrument(skip(state, shopper))]
pub async fn cancel(
    State(state): State<AppState>,
    shopper: Shopper,
    Path(id): Path<i32>,
) -> ApiResult<Json<CancelResponse>> {
    let owner = shopper
        .owner()
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    let order = state.orders().cancel(&owner, OrderId::new(id)).await?;

    Ok(Json(CancelResponse {
        ok: true,
        status: order.status.as_str(),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use tienda_core::{OrderStatus, UserId};

    use super::*;

    fn order(status: OrderStatus) -> Order {
        let placed = Utc.with_ymd_and_hms(2026, 3, 14, 18, 5, 0).unwrap();
        Order {
            id: OrderId::new(42),
            user_id: Some(UserId::new(1)),
            session_id: None,
            status,
            subtotal: Decimal::new(1_000, 0),
            shipping: Decimal::ZERO,
            total: Decimal::new(1_000, 0),
            shipping_address: None,
            created_at: placed,
            updated_at: placed,
        }
    }

    #[test]
    fn order_view_formats_ticket() {
        let view = OrderView::new(&order(OrderStatus::Pending), CurrencyCode::MXN);
        assert_eq!(view.ticket, "TP-000042");
        assert_eq!(view.placed_at, "2026-03-14 18:05 UTC");
        assert_eq!(view.total, "$1,000.00 MXN");
        assert!(view.can_cancel);
    }

    #[test]
    fn started_orders_are_not_cancellable() {
        let view = OrderView::new(&order(OrderStatus::InProgress), CurrencyCode::MXN);
        assert!(!view.can_cancel);
        assert_eq!(view.status_label, "In progress");
    }

    #[test]
    fn timeline_step_shows_new_status() {
        let event = StatusEvent {
            from_status: OrderStatus::Pending,
            to_status: OrderStatus::ReadyForPickup,
            changed_by: Some(UserId::new(3)),
            created_at: Utc.with_ymd_and_hms(2026, 3, 15, 9, 30, 0).unwrap(),
        };
        let step = StatusStepView::from(&event);
        assert_eq!(step.label, "Ready for pickup");
        assert_eq!(step.at, "2026-03-15 09:30 UTC");
    }
}
