//! Cart totals, the shipping rule and order snapshots.

use rust_decimal::Decimal;
use uuid::Uuid;

use tienda_core::{CartLineId, OrderStatus, ProductId, Size, UserId};
use tienda_storefront::config::ShopConfig;
use tienda_storefront::models::{Cart, CartLine, CartOwner};
use tienda_storefront::services::checkout::{CheckoutError, ShippingPolicy, build_order};

fn line(id: i32, size: Size, quantity: i32, price: &str) -> CartLine {
    CartLine {
        id: CartLineId::new(id),
        product_id: ProductId::new(id),
        product_name: format!("Playera {id}"),
        product_slug: format!("playera-{id}"),
        image_url: None,
        size,
        quantity,
        unit_price: price.parse().unwrap_or_default(),
    }
}

fn policy() -> ShippingPolicy {
    ShippingPolicy::from(&ShopConfig::default())
}

#[test]
fn test_shipping_charged_below_threshold() {
    let cart = Cart {
        lines: vec![line(1, Size::M, 2, "249.00")],
    };
    let totals = policy().totals(&cart);
    assert_eq!(totals.subtotal, Decimal::new(49_800, 2));
    assert_eq!(totals.shipping, Decimal::new(9_900, 2));
    assert_eq!(totals.total, Decimal::new(59_700, 2));
}

#[test]
fn test_shipping_free_at_threshold() {
    let cart = Cart {
        lines: vec![
            line(1, Size::M, 3, "249.00"),
            line(2, Size::L, 1, "252.00"),
        ],
    };
    let totals = policy().totals(&cart);
    assert_eq!(totals.subtotal, Decimal::new(999, 0));
    assert_eq!(totals.shipping, Decimal::ZERO);
    assert_eq!(totals.total, totals.subtotal);
}

#[test]
fn test_order_snapshots_every_line() {
    let cart = Cart {
        lines: vec![line(1, Size::S, 1, "199.00"), line(2, Size::XL, 4, "299.00")],
    };
    let owner = CartOwner::User(UserId::new(7));

    let Ok(order) = build_order(owner, &cart, &policy(), Some("  Av. Reforma 1, CDMX  ")) else {
        panic!("order rejected");
    };
    assert_eq!(order.owner, owner);
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.subtotal, Decimal::new(139_500, 2));
    assert_eq!(order.shipping, Decimal::ZERO);
    assert_eq!(order.shipping_address.as_deref(), Some("Av. Reforma 1, CDMX"));

    let second = order.items.get(1);
    assert_eq!(second.map(|item| item.size), Some(Size::XL));
    assert_eq!(second.map(|item| item.quantity), Some(4));
}

#[test]
fn test_empty_cart_cannot_check_out() {
    let owner = CartOwner::Session(Uuid::new_v4());
    assert!(matches!(
        build_order(owner, &Cart::default(), &policy(), None),
        Err(CheckoutError::EmptyCart)
    ));
}

#[test]
fn test_oversized_address_is_rejected() {
    let cart = Cart {
        lines: vec![line(1, Size::M, 1, "249.00")],
    };
    let address = "x".repeat(501);
    assert!(matches!(
        build_order(CartOwner::Session(Uuid::new_v4()), &cart, &policy(), Some(&address)),
        Err(CheckoutError::AddressTooLong)
    ));
}

#[test]
fn test_new_orders_start_pending_and_are_cancellable() {
    let status = OrderStatus::default();
    assert_eq!(status, OrderStatus::Pending);
    assert!(status.customer_can_cancel());
    assert!(status.check_transition(OrderStatus::Confirmed).is_ok());
    assert!(
        OrderStatus::Cancelled
            .check_transition(OrderStatus::Pending)
            .is_err()
    );
}
