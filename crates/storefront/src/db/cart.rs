//! Cart line repository.
//!
//! Lines belong to exactly one owner (a user or an anonymous session) and
//! there is at most one active line per (owner, product, size). Adding to an
//! existing line accumulates its quantity.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use tienda_core::{CartLineId, ProductId, Size, UserId};

use super::RepositoryError;
use crate::models::cart::{Cart, CartLine, CartOwner};

/// Matches rows of the owner bound as `$1` (user) and `$2` (session).
const OWNER_FILTER: &str = "(user_id = $1 OR session_id = $2)";

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: i32,
    product_id: i32,
    product_name: String,
    product_slug: String,
    image_url: Option<String>,
    size: Size,
    quantity: i32,
    unit_price: Decimal,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            id: CartLineId::new(row.id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            product_slug: row.product_slug,
            image_url: row.image_url,
            size: row.size,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SessionLineRow {
    product_id: i32,
    size: Size,
    quantity: i32,
    unit_price: Decimal,
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add `quantity` units of a product in a size to the owner's cart.
    ///
    /// Increments an existing active line (refreshing its unit price) or
    /// inserts a new one. Returns the line id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is inactive or not
    /// offered in `size`.
    /// Returns `RepositoryError::Conflict` if a concurrent add created the
    /// same line first.
    pub async fn add(
        &self,
        owner: &CartOwner,
        product_id: ProductId,
        size: Size,
        quantity: i32,
    ) -> Result<CartLineId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let unit_price: Decimal = sqlx::query_scalar(
            r"
            SELECT p.base_price
            FROM catalog.product p
            JOIN catalog.product_size ps ON ps.product_id = p.id
            WHERE p.id = $1 AND p.is_active AND ps.size = $2 AND ps.is_active
            ",
        )
        .bind(product_id)
        .bind(size)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let line_id = upsert_line(&mut tx, owner, product_id, size, quantity, unit_price).await?;

        tx.commit().await?;
        Ok(line_id)
    }

    /// Set a line's quantity. Zero deactivates the line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the owner has no such active line.
    pub async fn set_quantity(
        &self,
        owner: &CartOwner,
        line_id: CartLineId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        if quantity == 0 {
            return self.remove(owner, line_id).await;
        }

        let sql = format!(
            "UPDATE sales.cart_line SET quantity = $4, updated_at = NOW() \
             WHERE id = $3 AND is_active AND {OWNER_FILTER}"
        );
        let result = sqlx::query(&sql)
            .bind(owner.user_id())
            .bind(owner.session_id())
            .bind(line_id)
            .bind(quantity)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Deactivate one line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the owner has no such active line.
    pub async fn remove(
        &self,
        owner: &CartOwner,
        line_id: CartLineId,
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            "UPDATE sales.cart_line SET is_active = FALSE, updated_at = NOW() \
             WHERE id = $3 AND is_active AND {OWNER_FILTER}"
        );
        let result = sqlx::query(&sql)
            .bind(owner.user_id())
            .bind(owner.session_id())
            .bind(line_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// The owner's active lines with product name and slug, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, owner: &CartOwner) -> Result<Cart, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT cl.id, cl.product_id, p.name AS product_name, p.slug AS product_slug,
                   p.image_url, cl.size, cl.quantity, cl.unit_price
            FROM sales.cart_line cl
            JOIN catalog.product p ON p.id = cl.product_id
            WHERE (cl.user_id = $1 OR cl.session_id = $2) AND cl.is_active
            ORDER BY cl.id
            ",
        )
        .bind(owner.user_id())
        .bind(owner.session_id())
        .fetch_all(self.pool)
        .await?;

        Ok(Cart {
            lines: rows.into_iter().map(CartLine::from).collect(),
        })
    }

    /// Total units across the owner's active lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, owner: &CartOwner) -> Result<i64, RepositoryError> {
        let sql = format!(
            "SELECT COALESCE(SUM(quantity), 0)::int8 FROM sales.cart_line \
             WHERE is_active AND {OWNER_FILTER}"
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(owner.user_id())
            .bind(owner.session_id())
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Move an anonymous session's lines into a user's cart.
    ///
    /// Each session line whose product and size are still active is added
    /// to the user's cart with the same accumulate rule at the product's
    /// current price. Every session line is then deactivated, including the
    /// ones skipped. Returns the number of lines moved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; nothing
    /// is moved in that case.
    pub async fn merge_session_into_user(
        &self,
        session_id: Uuid,
        user_id: UserId,
    ) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let lines = sqlx::query_as::<_, SessionLineRow>(
            r"
            SELECT cl.product_id, cl.size, cl.quantity, p.base_price AS unit_price
            FROM sales.cart_line cl
            JOIN catalog.product p ON p.id = cl.product_id
            JOIN catalog.product_size ps ON ps.product_id = cl.product_id AND ps.size = cl.size
            WHERE cl.session_id = $1 AND cl.is_active AND p.is_active AND ps.is_active
            ORDER BY cl.id
            FOR UPDATE OF cl
            ",
        )
        .bind(session_id)
        .fetch_all(&mut *tx)
        .await?;

        let user = CartOwner::User(user_id);
        for line in &lines {
            upsert_line(
                &mut tx,
                &user,
                ProductId::new(line.product_id),
                line.size,
                line.quantity,
                line.unit_price,
            )
            .await?;
        }

        let retired = sqlx::query(
            "UPDATE sales.cart_line SET is_active = FALSE, updated_at = NOW() \
             WHERE session_id = $1 AND is_active",
        )
        .bind(session_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        tracing::debug!(moved = lines.len(), retired, "Session cart merged");
        Ok(lines.len())
    }

    /// Deactivate the given active lines of the owner. Returns how many were
    /// cleared. Lines of other owners and ids not in `line_ids` are untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn deactivate_lines(
        &self,
        owner: &CartOwner,
        line_ids: &[CartLineId],
    ) -> Result<u64, RepositoryError> {
        if line_ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<i32> = line_ids.iter().map(CartLineId::as_i32).collect();
        let sql = format!(
            "UPDATE sales.cart_line SET is_active = FALSE, updated_at = NOW() \
             WHERE id = ANY($3) AND is_active AND {OWNER_FILTER}"
        );
        let result = sqlx::query(&sql)
            .bind(owner.user_id())
            .bind(owner.session_id())
            .bind(&ids)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Increment the owner's active line for (product, size) or insert one.
async fn upsert_line(
    conn: &mut PgConnection,
    owner: &CartOwner,
    product_id: ProductId,
    size: Size,
    quantity: i32,
    unit_price: Decimal,
) -> Result<CartLineId, RepositoryError> {
    let find_sql = format!(
        "SELECT id FROM sales.cart_line \
         WHERE {OWNER_FILTER} AND product_id = $3 AND size = $4 AND is_active \
         FOR UPDATE"
    );
    let existing: Option<i32> = sqlx::query_scalar(&find_sql)
        .bind(owner.user_id())
        .bind(owner.session_id())
        .bind(product_id)
        .bind(size)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(id) = existing {
        sqlx::query(
            "UPDATE sales.cart_line \
             SET quantity = quantity + $2, unit_price = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(quantity)
        .bind(unit_price)
        .execute(&mut *conn)
        .await?;
        return Ok(CartLineId::new(id));
    }

    let id: i32 = sqlx::query_scalar(
        r"
        INSERT INTO sales.cart_line (user_id, session_id, product_id, size, quantity, unit_price)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        ",
    )
    .bind(owner.user_id())
    .bind(owner.session_id())
    .bind(product_id)
    .bind(size)
    .bind(quantity)
    .bind(unit_price)
    .fetch_one(&mut *conn)
    .await
    .map_err(RepositoryError::from_unique_violation)?;

    Ok(CartLineId::new(id))
}
