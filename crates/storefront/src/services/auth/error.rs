//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] tienda_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but has been deactivated.
    #[error("account is disabled")]
    AccountDisabled,

    /// No account with that ID.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Display name missing or too long.
    #[error("invalid display name: {0}")]
    InvalidDisplayName(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Form-field messages for errors caused by user input.
    #[must_use]
    pub fn field_errors(&self) -> Option<crate::services::FieldErrors> {
        use crate::services::FieldErrors;

        let errors = match self {
            Self::InvalidEmail(_) => FieldErrors::single("email", "Enter a valid email address"),
            Self::UserAlreadyExists => {
                FieldErrors::single("email", "An account with this email already exists")
            }
            Self::WeakPassword(msg) => FieldErrors::single("password", msg.clone()),
            Self::PasswordMismatch => {
                FieldErrors::single("password_confirm", "Passwords do not match")
            }
            Self::InvalidDisplayName(msg) => FieldErrors::single("display_name", msg.clone()),
            _ => return None,
        };
        Some(errors)
    }
}
