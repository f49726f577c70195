//! Order history, tickets, customer cancellation and staff status changes.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use tienda_core::{OrderId, OrderStatus, StatusTransitionError, UserId};

use crate::db::{OrderRepository, RepositoryError};
use crate::models::cart::CartOwner;
use crate::models::listing::{Page, clamp_page_size};
use crate::models::order::{Order, OrderDetail, StatusEvent};

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order not found")]
    NotFound,

    #[error(transparent)]
    Transition(#[from] StatusTransitionError),

    #[error("only pending orders can be cancelled")]
    NotCancellable,

    #[error("order was changed by someone else")]
    Conflict,

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for OrderError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(_) => Self::Conflict,
            other => Self::Repository(other),
        }
    }
}

/// Order service.
pub struct OrderService<'a> {
    orders: OrderRepository<'a>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            orders: OrderRepository::new(pool),
        }
    }

    /// The owner's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn for_owner(&self, owner: &CartOwner) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_for_owner(owner).await?)
    }

    /// An order with items, visible only to its owner.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for unknown orders and orders of other
    /// owners.
    pub async fn ticket(&self, owner: &CartOwner, id: OrderId) -> Result<OrderDetail, OrderError> {
        self.orders
            .get_detail(id)
            .await?
            .filter(|detail| detail.order.is_owned_by(owner))
            .ok_or(OrderError::NotFound)
    }

    /// Cancel one of the owner's orders while it is still pending.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for unknown or foreign orders and
    /// `OrderError::NotCancellable` once work on the order has started.
    #[instrument(skip(self, owner), fields(order_id = %id))]
    pub async fn cancel(&self, owner: &CartOwner, id: OrderId) -> Result<Order, OrderError> {
        let detail = self.ticket(owner, id).await?;
        let current = detail.order.status;
        if !current.customer_can_cancel() {
            return Err(OrderError::NotCancellable);
        }

        let order = self
            .orders
            .update_status(id, current, OrderStatus::Cancelled, owner.user_id())
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => OrderError::NotCancellable,
                other => other.into(),
            })?;

        tracing::info!(ticket = %order.ticket_code(), "Order cancelled by customer");
        Ok(order)
    }

    // =========================================================================
    // Back-office
    // =========================================================================

    /// All orders, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Order>, OrderError> {
        Ok(self
            .orders
            .list(status, page.max(1), clamp_page_size(page_size))
            .await?)
    }

    /// Any order with items.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order doesn't exist.
    pub async fn detail(&self, id: OrderId) -> Result<OrderDetail, OrderError> {
        self.orders.get_detail(id).await?.ok_or(OrderError::NotFound)
    }

    /// Move an order to `next`, recording the staff member.
    ///
    /// Completed and cancelled orders are final; any other change is allowed
    /// except a no-op.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Transition` for a terminal or unchanged status and
    /// `OrderError::Conflict` if the order moved in the meantime.
    #[instrument(skip(self), fields(order_id = %id, next = %next))]
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
        changed_by: UserId,
    ) -> Result<Order, OrderError> {
        let current = self.detail(id).await?.order.status;
        current.check_transition(next)?;

        let order = self
            .orders
            .update_status(id, current, next, Some(changed_by))
            .await?;

        tracing::info!(
            ticket = %order.ticket_code(),
            from = %current,
            to = %next,
            "Order status changed"
        );
        Ok(order)
    }

    /// Status changes of an order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn history(&self, id: OrderId) -> Result<Vec<StatusEvent>, OrderError> {
        Ok(self.orders.history(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_errors_map_to_order_errors() {
        assert!(matches!(
            OrderError::from(RepositoryError::NotFound),
            OrderError::NotFound
        ));
        assert!(matches!(
            OrderError::from(RepositoryError::Conflict("order_status_changed".to_owned())),
            OrderError::Conflict
        ));
    }

    #[test]
    fn transition_errors_carry_their_message() {
        let err = OrderError::from(StatusTransitionError::Terminal(OrderStatus::Completed));
        assert_eq!(err.to_string(), "order is completed and can no longer change");
    }
}
