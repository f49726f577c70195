//! Cart domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tienda_core::{CartLineId, ProductId, Size, UserId};

/// Who a cart (and the orders placed from it) belongs to.
///
/// Exactly one of the two is ever stored on a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CartOwner {
    /// A logged-in user.
    User(UserId),
    /// An anonymous visitor, identified by a UUID kept in their session.
    Session(Uuid),
}

impl CartOwner {
    /// The user column value for this owner.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Session(_) => None,
        }
    }

    /// The session column value for this owner.
    #[must_use]
    pub const fn session_id(&self) -> Option<Uuid> {
        match self {
            Self::User(_) => None,
            Self::Session(id) => Some(*id),
        }
    }
}

/// An active cart line joined with its product.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_slug: String,
    pub image_url: Option<String>,
    pub size: Size,
    pub quantity: i32,
    /// Product price when the line was last added to.
    pub unit_price: Decimal,
}

impl CartLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The active lines of one owner.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|line| i64::from(line.quantity)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Ids of the lines in this snapshot.
    #[must_use]
    pub fn line_ids(&self) -> Vec<CartLineId> {
        self.lines.iter().map(|line| line.id).collect()
    }
}
