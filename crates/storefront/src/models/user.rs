//! User domain types.

use chrono::{DateTime, Utc};

use tienda_core::{Email, Role, UserId};

/// A shop account: customer, employee or admin.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub display_name: String,
    pub role: Role,
    /// Inactive accounts cannot log in.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
