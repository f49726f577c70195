//! Authentication and role extractors.
//!
//! `RequireStaff` and `RequireAdmin` read the [`CurrentUser`] stored in the
//! session at login and check its role for the back-office.

use axum::{
    extract::FromRequestParts,
    http::{Method, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::{ApiError, AppError};
use crate::models::{CurrentUser, session_keys};

/// Extractor that requires an admin or employee.
///
/// ```rust,ignore
/// async fn orders(RequireStaff(user): RequireStaff) -> impl IntoResponse {
///     format!("Hola, {}!", user.display_name)
/// }
/// ```
pub struct RequireStaff(pub CurrentUser);

/// Extractor that requires an admin.
pub struct RequireAdmin(pub CurrentUser);

/// Rejection for the auth extractors.
#[derive(Debug)]
pub enum AuthRejection {
    /// Page request without a login: go log in.
    RedirectToLogin,
    /// Mutation without a login.
    Unauthorized,
    /// Logged in without the required role.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => {
                ApiError(AppError::Unauthorized("Please log in".to_string())).into_response()
            }
            Self::Forbidden => ApiError(AppError::Forbidden(
                "You don't have permission to do that".to_string(),
            ))
            .into_response(),
        }
    }
}

/// Read the current user from the session in the request extensions.
async fn current_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// GET pages redirect to the login form; everything else gets a 401 envelope.
fn missing_login(parts: &Parts) -> AuthRejection {
    if parts.method == Method::GET {
        AuthRejection::RedirectToLogin
    } else {
        AuthRejection::Unauthorized
    }
}

impl<S> FromRequestParts<S> for RequireStaff
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts).await.ok_or_else(|| missing_login(parts))?;
        if !user.role.is_staff() {
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts).await.ok_or_else(|| missing_login(parts))?;
        if !user.role.can_manage_employees() {
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

/// Store the logged-in user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Remove the logged-in user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}
