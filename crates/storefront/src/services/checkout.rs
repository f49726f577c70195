//! Checkout: shipping rule, order totals and order creation from a cart.

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use crate::config::ShopConfig;
use crate::db::{OrderRepository, RepositoryError};
use crate::models::cart::{Cart, CartOwner};
use crate::models::order::{NewOrder, NewOrderItem, OrderDetail};

/// Maximum stored length of a shipping address.
pub const MAX_ADDRESS_LENGTH: usize = 500;

/// Errors from checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("shipping address must be at most {MAX_ADDRESS_LENGTH} characters")]
    AddressTooLong,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Flat shipping rule: free at or above the threshold, a fixed fee below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    pub free_threshold: Decimal,
    pub fee: Decimal,
}

impl From<&ShopConfig> for ShippingPolicy {
    fn from(shop: &ShopConfig) -> Self {
        Self {
            free_threshold: shop.free_shipping_threshold,
            fee: shop.shipping_fee,
        }
    }
}

impl ShippingPolicy {
    /// Shipping charged for a subtotal.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal >= self.free_threshold {
            Decimal::ZERO
        } else {
            self.fee
        }
    }

    /// Subtotal, shipping and total for a cart.
    #[must_use]
    pub fn totals(&self, cart: &Cart) -> OrderTotals {
        let subtotal = cart.subtotal();
        let shipping = self.shipping_for(subtotal);
        OrderTotals {
            subtotal,
            shipping,
            total: subtotal + shipping,
        }
    }
}

/// Amounts shown on the cart page and stored on the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// Snapshot a cart into an order ready to insert.
///
/// Each line's cached unit price is copied as-is.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` when the cart has no lines and
/// `CheckoutError::AddressTooLong` for an oversized address.
pub fn build_order(
    owner: CartOwner,
    cart: &Cart,
    policy: &ShippingPolicy,
    shipping_address: Option<&str>,
) -> Result<NewOrder, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let shipping_address = shipping_address
        .map(str::trim)
        .filter(|address| !address.is_empty());
    if shipping_address.is_some_and(|address| address.chars().count() > MAX_ADDRESS_LENGTH) {
        return Err(CheckoutError::AddressTooLong);
    }

    let totals = policy.totals(cart);
    let items = cart
        .lines
        .iter()
        .map(|line| NewOrderItem {
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            size: line.size,
            quantity: line.quantity,
            unit_price: line.unit_price,
        })
        .collect();

    Ok(NewOrder {
        owner,
        subtotal: totals.subtotal,
        shipping: totals.shipping,
        total: totals.total,
        shipping_address: shipping_address.map(str::to_owned),
        items,
    })
}

/// Places orders. The cart is left untouched; callers clear it afterward.
pub struct CheckoutService<'a> {
    orders: OrderRepository<'a>,
    policy: ShippingPolicy,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub fn new(pool: &'a PgPool, shop: &ShopConfig) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            policy: ShippingPolicy::from(shop),
        }
    }

    /// Create a pending order from the owner's cart in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` for an empty cart and
    /// `CheckoutError::Repository` if the insert fails (nothing is stored).
    #[instrument(skip(self, cart, shipping_address), fields(lines = cart.lines.len()))]
    pub async fn place_order(
        &self,
        owner: CartOwner,
        cart: &Cart,
        shipping_address: Option<&str>,
    ) -> Result<OrderDetail, CheckoutError> {
        let new_order = build_order(owner, cart, &self.policy, shipping_address)?;
        let detail = self.orders.insert(&new_order).await?;

        tracing::info!(
            ticket = %detail.order.ticket_code(),
            total = %detail.order.total,
            "Order placed"
        );
        Ok(detail)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tienda_core::{CartLineId, ProductId, Size, UserId};

    use super::*;
    use crate::models::cart::CartLine;

    fn policy() -> ShippingPolicy {
        ShippingPolicy::from(&ShopConfig::default())
    }

    fn line(id: i32, price: Decimal, quantity: i32) -> CartLine {
        CartLine {
            id: CartLineId::new(id),
            product_id: ProductId::new(id),
            product_name: format!("Playera {id}"),
            product_slug: format!("playera-{id}"),
            image_url: None,
            size: Size::M,
            quantity,
            unit_price: price,
        }
    }

    fn owner() -> CartOwner {
        CartOwner::User(UserId::new(1))
    }

    #[test]
    fn shipping_is_charged_below_threshold() {
        assert_eq!(
            policy().shipping_for(Decimal::new(99_899, 2)),
            Decimal::new(99, 0)
        );
    }

    #[test]
    fn shipping_is_free_at_threshold() {
        assert_eq!(policy().shipping_for(Decimal::new(999, 0)), Decimal::ZERO);
        assert_eq!(policy().shipping_for(Decimal::new(5_000, 0)), Decimal::ZERO);
    }

    #[test]
    fn total_is_items_plus_shipping() {
        let cart = Cart {
            lines: vec![
                line(1, Decimal::new(24_950, 2), 2),
                line(2, Decimal::new(19_900, 2), 1),
            ],
        };

        let order = build_order(owner(), &cart, &policy(), None).unwrap();

        let items_sum: Decimal = order
            .items
            .iter()
            .map(|item| item.unit_price * Decimal::from(item.quantity))
            .sum();
        assert_eq!(order.subtotal, Decimal::new(69_800, 2));
        assert_eq!(order.subtotal, items_sum);
        assert_eq!(order.shipping, Decimal::new(99, 0));
        assert_eq!(order.total, items_sum + order.shipping);
    }

    #[test]
    fn items_copy_cart_lines() {
        let cart = Cart {
            lines: vec![line(3, Decimal::new(500, 0), 3)],
        };

        let order = build_order(owner(), &cart, &policy(), Some("  Av. Reforma 1, CDMX ")).unwrap();

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_name, "Playera 3");
        assert_eq!(order.items[0].quantity, 3);
        assert_eq!(order.shipping, Decimal::ZERO);
        assert_eq!(order.shipping_address.as_deref(), Some("Av. Reforma 1, CDMX"));
    }

    #[test]
    fn empty_cart_is_rejected() {
        assert!(matches!(
            build_order(owner(), &Cart::default(), &policy(), None),
            Err(CheckoutError::EmptyCart)
        ));
    }

    #[test]
    fn blank_address_is_dropped_and_long_address_rejected() {
        let cart = Cart {
            lines: vec![line(1, Decimal::ONE, 1)],
        };
        let order = build_order(owner(), &cart, &policy(), Some("   ")).unwrap();
        assert_eq!(order.shipping_address, None);

        let long = "x".repeat(MAX_ADDRESS_LENGTH + 1);
        assert!(matches!(
            build_order(owner(), &cart, &policy(), Some(&long)),
            Err(CheckoutError::AddressTooLong)
        ));
    }
}
