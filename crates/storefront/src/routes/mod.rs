//! HTTP route handlers for the storefront and back-office.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                               - Home page
//!
//! # Catalog
//! GET  /products                       - Filtered listing (q, tag, category, page, page_size, sort)
//! GET  /products/{slug}                - Product detail
//!
//! # Cart (JSON when the client accepts it, redirect otherwise)
//! GET  /cart                           - Cart page
//! POST /cart/add                       - {ok, count}
//! POST /cart/update                    - {ok, count, subtotal}
//! POST /cart/remove                    - {ok, count, subtotal}
//! GET  /cart/count                     - {ok, count}
//! POST /checkout                       - Place order, clear cart, go to ticket
//!
//! # Orders
//! GET  /orders                         - Order history
//! GET  /orders/{id}                    - Ticket
//! POST /orders/{id}/cancel             - {ok, status}
//!
//! # Auth
//! GET  /auth/login, /auth/register     - Forms
//! POST /auth/login, /auth/register     - Actions
//! POST /auth/logout                    - Logout
//!
//! # Back-office (see `admin`)
//! /admin/...
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod home;
pub mod orders;
pub mod products;

use axum::{
    Router,
    http::{HeaderMap, header::ACCEPT},
    routing::{get, post},
};
use rust_decimal::Decimal;

use tienda_core::{CurrencyCode, Money};

use crate::error::AppError;
use crate::middleware::{CspNonce, Shopper, auth_rate_limiter, cart_rate_limiter};
use crate::models::CurrentUser;
use crate::state::AppState;

// =============================================================================
// Shared view helpers
// =============================================================================

/// Data every page layout needs.
#[derive(Clone)]
pub struct Layout {
    pub user: Option<CurrentUser>,
    pub cart_count: i64,
    pub nonce: String,
}

impl Layout {
    /// Build the layout for a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the session or the cart count query fails.
    pub async fn build(
        state: &AppState,
        shopper: &Shopper,
        CspNonce(nonce): CspNonce,
    ) -> Result<Self, AppError> {
        let cart_count = match shopper.owner().await? {
            Some(owner) => state.cart().count(&owner).await?,
            None => 0,
        };
        Ok(Self {
            user: shopper.user.clone(),
            cart_count,
            nonce,
        })
    }

    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.role.is_staff())
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user
            .as_ref()
            .is_some_and(|u| u.role.can_manage_employees())
    }
}

/// Format an amount in the shop currency, e.g. `$1,299.00 MXN`.
#[must_use]
pub fn format_money(currency: CurrencyCode, amount: Decimal) -> String {
    Money::new(amount, currency).to_string()
}

/// Whether the client asked for a JSON response.
#[must_use]
pub fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

// =============================================================================
// Routers
// =============================================================================

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{slug}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    let mutations = Router::new()
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .layer(cart_rate_limiter());

    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .merge(mutations)
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .merge(
            Router::new()
                .route("/checkout", post(cart::checkout))
                .layer(cart_rate_limiter()),
        )
        .nest("/orders", order_routes())
        .nest("/auth", auth_routes())
        .nest("/admin", admin::routes())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn detects_json_accept_header() {
        let mut headers = HeaderMap::new();
        assert!(!wants_json(&headers));

        headers.insert(ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml"));
        assert!(!wants_json(&headers));

        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        assert!(wants_json(&headers));
    }

    #[test]
    fn money_uses_shop_currency() {
        assert_eq!(
            format_money(CurrencyCode::MXN, Decimal::new(129_900, 2)),
            "$1,299.00 MXN"
        );
    }
}
