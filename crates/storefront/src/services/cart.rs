//! Cart service: validated add/update/remove over the cart repository.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use tienda_core::{CartLineId, ProductId, Size, UserId};

use super::FieldErrors;
use crate::db::{CartRepository, RepositoryError};
use crate::models::cart::{Cart, CartOwner};

/// Largest quantity accepted by a single add or update request.
///
/// Repeated adds accumulate past it.
pub const MAX_LINE_QUANTITY: i32 = 999;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("not found")]
    NotFound,

    #[error("the cart changed while it was being updated")]
    Conflict,

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CartError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(_) => Self::Conflict,
            other => Self::Repository(other),
        }
    }
}

/// `POST /cart/add` form.
#[derive(Debug, Clone, Deserialize)]
pub struct AddToCart {
    pub product_id: i32,
    pub size: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

impl AddToCart {
    /// Validate the size label and quantity.
    ///
    /// # Errors
    ///
    /// Returns field errors for an unknown size or a quantity outside
    /// `1..=MAX_LINE_QUANTITY`.
    pub fn validate(&self) -> Result<(ProductId, Size, i32), FieldErrors> {
        let mut errors = FieldErrors::new();

        let size = self
            .size
            .parse::<Size>()
            .map_err(|_| errors.add("size", "Choose a valid size"))
            .ok();

        if let Err(message) = check_quantity(self.quantity, 1) {
            errors.add("quantity", message);
        }

        match size {
            Some(size) if errors.is_empty() => {
                Ok((ProductId::new(self.product_id), size, self.quantity))
            }
            _ => Err(errors),
        }
    }
}

/// Check that `quantity` lies in `min..=MAX_LINE_QUANTITY`.
fn check_quantity(quantity: i32, min: i32) -> Result<(), &'static str> {
    if quantity < min {
        return Err(if min == 0 {
            "Quantity must not be negative"
        } else {
            "Quantity must be at least 1"
        });
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err("Quantity must be at most 999");
    }
    Ok(())
}

/// Cart count and subtotal returned after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSummary {
    pub count: i64,
    pub subtotal: Decimal,
}

impl From<&Cart> for CartSummary {
    fn from(cart: &Cart) -> Self {
        Self {
            count: cart.item_count(),
            subtotal: cart.subtotal(),
        }
    }
}

/// Cart service.
pub struct CartService<'a> {
    lines: CartRepository<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            lines: CartRepository::new(pool),
        }
    }

    /// Add a product in a size to the cart, accumulating onto an existing line.
    ///
    /// Returns the owner's new item count.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` for a bad size or quantity.
    /// Returns `CartError::NotFound` if the product is inactive or not offered
    /// in that size, and `CartError::Conflict` if a concurrent add created the
    /// same line first.
    #[instrument(skip(self, form), fields(product_id = form.product_id, size = %form.size))]
    pub async fn add(&self, owner: &CartOwner, form: &AddToCart) -> Result<i64, CartError> {
        let (product_id, size, quantity) = form.validate().map_err(CartError::Validation)?;

        let line_id = self.lines.add(owner, product_id, size, quantity).await?;
        tracing::debug!(line_id = %line_id, quantity, "Cart line upserted");

        Ok(self.lines.count(owner).await?)
    }

    /// Set a line's quantity; zero removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` for a negative or too large quantity.
    /// Returns `CartError::NotFound` if the owner has no such line.
    pub async fn update(
        &self,
        owner: &CartOwner,
        line_id: CartLineId,
        quantity: i32,
    ) -> Result<CartSummary, CartError> {
        check_quantity(quantity, 0)
            .map_err(|message| CartError::Validation(FieldErrors::single("quantity", message)))?;
        self.lines.set_quantity(owner, line_id, quantity).await?;
        self.summary(owner).await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` if the owner has no such line.
    pub async fn remove(
        &self,
        owner: &CartOwner,
        line_id: CartLineId,
    ) -> Result<CartSummary, CartError> {
        self.lines.remove(owner, line_id).await?;
        self.summary(owner).await
    }

    /// The owner's active lines.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn cart(&self, owner: &CartOwner) -> Result<Cart, CartError> {
        Ok(self.lines.list(owner).await?)
    }

    /// Units in the owner's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn count(&self, owner: &CartOwner) -> Result<i64, CartError> {
        Ok(self.lines.count(owner).await?)
    }

    /// Remove the lines of an ordered cart snapshot.
    ///
    /// Lines added after `ordered` was read stay in the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the update fails.
    pub async fn clear_ordered(
        &self,
        owner: &CartOwner,
        ordered: &Cart,
    ) -> Result<u64, CartError> {
        Ok(self.lines.deactivate_lines(owner, &ordered.line_ids()).await?)
    }

    /// Fold an anonymous session cart into the user's cart after login.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the merge fails; nothing moves then.
    pub async fn merge_on_login(
        &self,
        session_id: Uuid,
        user_id: UserId,
    ) -> Result<usize, CartError> {
        let moved = self.lines.merge_session_into_user(session_id, user_id).await?;
        if moved > 0 {
            tracing::info!(user_id = %user_id, moved, "Merged session cart into user cart");
        }
        Ok(moved)
    }

    async fn summary(&self, owner: &CartOwner) -> Result<CartSummary, CartError> {
        let cart = self.lines.list(owner).await?;
        Ok(CartSummary::from(&cart))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn add(size: &str, quantity: i32) -> AddToCart {
        AddToCart {
            product_id: 7,
            size: size.to_owned(),
            quantity,
        }
    }

    #[test]
    fn valid_add_is_parsed() {
        let (product_id, size, quantity) = add("m", 2).validate().unwrap();
        assert_eq!(product_id, ProductId::new(7));
        assert_eq!(size, Size::M);
        assert_eq!(quantity, 2);
    }

    #[test]
    fn quantity_must_be_positive() {
        let errors = add("M", 0).validate().unwrap_err();
        assert_eq!(errors.get("quantity"), Some("Quantity must be at least 1"));
        assert!(add("M", -3).validate().is_err());
    }

    #[test]
    fn quantity_is_capped() {
        assert!(add("M", MAX_LINE_QUANTITY).validate().is_ok());
        let errors = add("M", MAX_LINE_QUANTITY + 1).validate().unwrap_err();
        assert_eq!(errors.get("quantity"), Some("Quantity must be at most 999"));
    }

    #[test]
    fn unknown_size_and_bad_quantity_both_reported() {
        let errors = add("XXXL", 0).validate().unwrap_err();
        assert_eq!(errors.get("size"), Some("Choose a valid size"));
        assert!(errors.get("quantity").is_some());
    }

    #[test]
    fn quantity_defaults_to_one() {
        let form: AddToCart = serde_json::from_str(r#"{"product_id": 3, "size": "L"}"#).unwrap();
        assert_eq!(form.quantity, 1);
    }

    #[test]
    fn update_allows_zero() {
        assert!(check_quantity(0, 0).is_ok());
        assert_eq!(check_quantity(-1, 0), Err("Quantity must not be negative"));
    }

    #[test]
    fn not_found_maps_through() {
        assert!(matches!(
            CartError::from(RepositoryError::NotFound),
            CartError::NotFound
        ));
        assert!(matches!(
            CartError::from(RepositoryError::Conflict(
                "cart_line_user_product_size_key".to_owned()
            )),
            CartError::Conflict
        ));
    }
}
