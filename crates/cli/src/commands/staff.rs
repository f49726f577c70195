//! Staff account commands.
//!
//! `staff create` is how the first admin gets in; later accounts can be
//! created from `/admin/employees`.

use tienda_core::Role;
use tienda_storefront::services::auth::{AuthError, AuthService};

use super::{CommandError, connect};

#[derive(Debug, thiserror::Error)]
pub enum StaffError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Invalid role: {0}. Valid roles: admin, employee")]
    InvalidRole(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Parse a staff role, rejecting `customer`.
fn parse_staff_role(raw: &str) -> Result<Role, StaffError> {
    raw.trim()
        .parse::<Role>()
        .ok()
        .filter(|role| role.is_staff())
        .ok_or_else(|| StaffError::InvalidRole(raw.to_owned()))
}

/// Create an admin or employee account.
///
/// # Errors
///
/// Returns an error for a non-staff role, invalid input, a taken email or a
/// database failure.
pub async fn create(
    email: &str,
    name: &str,
    role: &str,
    password: &str,
) -> Result<i32, StaffError> {
    let role = parse_staff_role(role)?;
    let pool = connect().await?;

    tracing::info!("Creating staff account: {} ({})", email, role);
    let user = AuthService::new(&pool)
        .create_account(email, name, role, password)
        .await?;

    tracing::info!(
        "Staff account created! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(user.id.as_i32())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_roles_parse() {
        assert!(matches!(parse_staff_role("admin"), Ok(Role::Admin)));
        assert!(matches!(parse_staff_role(" employee "), Ok(Role::Employee)));
    }

    #[test]
    fn customer_role_is_rejected() {
        assert!(matches!(
            parse_staff_role("customer"),
            Err(StaffError::InvalidRole(_))
        ));
        assert!(parse_staff_role("owner").is_err());
    }
}
