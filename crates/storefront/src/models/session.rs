//! What the session remembers between requests.

use serde::{Deserialize, Serialize};

use tienda_core::{Email, Role, UserId};

use super::user::User;

/// The logged-in account, copied into the session at login.
///
/// Role changes and deactivation take effect at the next login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub display_name: String,
    pub role: Role,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
        }
    }
}

pub mod keys {
    pub const CURRENT_USER: &str = "current_user";
    /// Anonymous cart owner UUID.
    pub const CART_SESSION: &str = "cart_session";
}
