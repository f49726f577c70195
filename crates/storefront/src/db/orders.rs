//! Order repository: order creation, owner and admin listings, status changes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use tienda_core::{OrderId, OrderItemId, OrderStatus, ProductId, Size, UserId};

use super::RepositoryError;
use crate::models::cart::CartOwner;
use crate::models::listing::Page;
use crate::models::order::{NewOrder, Order, OrderDetail, OrderItem, StatusEvent};

const ORDER_COLUMNS: &str = "id, user_id, session_id, status, subtotal, shipping, total, \
                             shipping_address, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: Option<i32>,
    session_id: Option<Uuid>,
    status: OrderStatus,
    subtotal: Decimal,
    shipping: Decimal,
    total: Decimal,
    shipping_address: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            user_id: row.user_id.map(UserId::new),
            session_id: row.session_id,
            status: row.status,
            subtotal: row.subtotal,
            shipping: row.shipping,
            total: row.total,
            shipping_address: row.shipping_address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    product_id: i32,
    product_name: String,
    size: Size,
    quantity: i32,
    unit_price: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: OrderItemId::new(row.id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            size: row.size,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StatusEventRow {
    from_status: OrderStatus,
    to_status: OrderStatus,
    changed_by: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<StatusEventRow> for StatusEvent {
    fn from(row: StatusEventRow) -> Self {
        Self {
            from_status: row.from_status,
            to_status: row.to_status,
            changed_by: row.changed_by.map(UserId::new),
            created_at: row.created_at,
        }
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist an order and its items in one transaction. Status starts `Pending`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails; nothing is
    /// written in that case.
    pub async fn insert(&self, new: &NewOrder) -> Result<OrderDetail, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO sales.order \
                 (user_id, session_id, status, subtotal, shipping, total, shipping_address) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {ORDER_COLUMNS}"
        );
        let order = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(new.owner.user_id())
            .bind(new.owner.session_id())
            .bind(OrderStatus::Pending)
            .bind(new.subtotal)
            .bind(new.shipping)
            .bind(new.total)
            .bind(new.shipping_address.as_deref())
            .fetch_one(&mut *tx)
            .await?;

        let mut items = Vec::with_capacity(new.items.len());
        for item in &new.items {
            let row = sqlx::query_as::<_, OrderItemRow>(
                r"
                INSERT INTO sales.order_item
                    (order_id, product_id, product_name, size, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, product_id, product_name, size, quantity, unit_price
                ",
            )
            .bind(order.id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.size)
            .bind(item.quantity)
            .bind(item.unit_price)
            .fetch_one(&mut *tx)
            .await?;
            items.push(OrderItem::from(row));
        }

        tx.commit().await?;

        Ok(OrderDetail {
            order: order.into(),
            items,
        })
    }

    /// The owner's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_owner(&self, owner: &CartOwner) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM sales.order \
             WHERE (user_id = $1 OR session_id = $2) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(owner.user_id())
            .bind(owner.session_id())
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// An order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_detail(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM sales.order WHERE id = $1");
        let Some(order) = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, product_id, product_name, size, quantity, unit_price
            FROM sales.order_item
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(OrderDetail {
            order: order.into(),
            items: items.into_iter().map(OrderItem::from).collect(),
        }))
    }

    /// All orders, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Order>, RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sales.order \
             WHERE ($1::sales.order_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM sales.order \
             WHERE ($1::sales.order_status IS NULL OR status = $1) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        let offset = i64::from(page.saturating_sub(1)) * i64::from(page_size);
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(status)
            .bind(i64::from(page_size))
            .bind(offset)
            .fetch_all(self.pool)
            .await?;

        Ok(Page {
            items: rows.into_iter().map(Order::from).collect(),
            total,
            page,
            page_size,
        })
    }

    /// Move an order from `from` to `to`, recording who did it.
    ///
    /// The update only applies while the order is still in `from`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order's status changed
    /// since it was read.
    pub async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        changed_by: Option<UserId>,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE sales.order SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $2 \
             RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::Conflict("order_status_changed".to_owned()))?;

        sqlx::query(
            r"
            INSERT INTO sales.order_status_event (order_id, from_status, to_status, changed_by)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(changed_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Status changes of an order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn history(&self, id: OrderId) -> Result<Vec<StatusEvent>, RepositoryError> {
        let rows = sqlx::query_as::<_, StatusEventRow>(
            r"
            SELECT from_status, to_status, changed_by, created_at
            FROM sales.order_status_event
            WHERE order_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(StatusEvent::from).collect())
    }
}
