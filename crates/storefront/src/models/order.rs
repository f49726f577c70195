//! Order (ticket) domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use tienda_core::{OrderId, OrderItemId, OrderStatus, ProductId, Size, UserId};

use super::cart::CartOwner;

/// A placed order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub session_id: Option<Uuid>,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    /// Always `subtotal + shipping`.
    pub total: Decimal,
    pub shipping_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Customer-facing ticket code, e.g. `TP-000042`.
    #[must_use]
    pub fn ticket_code(&self) -> String {
        self.id.ticket_code()
    }

    /// Whether `owner` placed this order.
    #[must_use]
    pub fn is_owned_by(&self, owner: &CartOwner) -> bool {
        match owner {
            CartOwner::User(id) => self.user_id == Some(*id),
            CartOwner::Session(id) => self.session_id == Some(*id),
        }
    }
}

/// A line of an order. Product name and price are snapshots taken at checkout.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub size: Size,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// An order with its items.
#[derive(Debug, Clone)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// A staff status change recorded against an order.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEvent {
    pub from_status: OrderStatus,
    pub to_status: OrderStatus,
    pub changed_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// An order ready to be persisted, built from a cart at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub owner: CartOwner,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub shipping_address: Option<String>,
    pub items: Vec<NewOrderItem>,
}

/// A cart line copied into an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub size: Size,
    pub quantity: i32,
    pub unit_price: Decimal,
}
