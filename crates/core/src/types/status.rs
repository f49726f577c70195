//! Status and role enums.

use serde::{Deserialize, Serialize};

/// Lifecycle of an order (ticket).
///
/// `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "sales.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    InProgress,
    ReadyForPickup,
    Completed,
    Cancelled,
}

/// Rejected order status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StatusTransitionError {
    #[error("order is already {0}")]
    Unchanged(OrderStatus),
    #[error("order is {0} and can no longer change")]
    Terminal(OrderStatus),
}

impl OrderStatus {
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::InProgress,
        Self::ReadyForPickup,
        Self::Completed,
        Self::Cancelled,
    ];

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Check that staff may move an order from `self` to `next`.
    ///
    /// # Errors
    ///
    /// Returns `Terminal` when the order is completed or cancelled and
    /// `Unchanged` when `next` equals the current status.
    pub const fn check_transition(self, next: Self) -> Result<(), StatusTransitionError> {
        if self.is_terminal() {
            return Err(StatusTransitionError::Terminal(self));
        }
        if self as u8 == next as u8 {
            return Err(StatusTransitionError::Unchanged(self));
        }
        Ok(())
    }

    /// Customers may only cancel orders nobody has started on.
    #[must_use]
    pub const fn customer_can_cancel(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Human-readable label for templates.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::InProgress => "In progress",
            Self::ReadyForPickup => "Ready for pickup",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Wire/database name (`ready_for_pickup`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::ReadyForPickup => "ready_for_pickup",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Role of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "tienda.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full back-office access including employee management.
    Admin,
    /// Catalog and order management.
    Employee,
    /// Shop customer.
    #[default]
    Customer,
}

impl Role {
    /// Whether the role may enter the back-office at all.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Employee)
    }

    #[must_use]
    pub const fn can_manage_employees(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Employee => write!(f, "employee"),
            Self::Customer => write!(f, "customer"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "employee" => Ok(Self::Employee),
            "customer" => Ok(Self::Customer),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_reject_every_change() {
        for next in OrderStatus::ALL {
            assert_eq!(
                OrderStatus::Completed.check_transition(next),
                Err(StatusTransitionError::Terminal(OrderStatus::Completed))
            );
            assert!(OrderStatus::Cancelled.check_transition(next).is_err());
        }
    }

    #[test]
    fn open_statuses_move_freely() {
        assert!(
            OrderStatus::Pending
                .check_transition(OrderStatus::ReadyForPickup)
                .is_ok()
        );
        assert!(
            OrderStatus::InProgress
                .check_transition(OrderStatus::Confirmed)
                .is_ok()
        );
        assert!(
            OrderStatus::Confirmed
                .check_transition(OrderStatus::Cancelled)
                .is_ok()
        );
    }

    #[test]
    fn same_status_is_rejected() {
        assert_eq!(
            OrderStatus::Confirmed.check_transition(OrderStatus::Confirmed),
            Err(StatusTransitionError::Unchanged(OrderStatus::Confirmed))
        );
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn only_pending_orders_are_customer_cancellable() {
        let cancellable: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(|s| s.customer_can_cancel())
            .collect();
        assert_eq!(cancellable, vec![OrderStatus::Pending]);
    }

    #[test]
    fn role_permissions() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Employee.is_staff());
        assert!(!Role::Customer.is_staff());
        assert!(Role::Admin.can_manage_employees());
        assert!(!Role::Employee.can_manage_employees());
    }

    #[test]
    fn role_parses_display_form() {
        for role in [Role::Admin, Role::Employee, Role::Customer] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }
}
