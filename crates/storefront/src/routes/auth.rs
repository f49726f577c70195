//! Login, registration and logout handlers.
//!
//! A successful login stores [`CurrentUser`] in the session, cycles the
//! session id and folds the visitor's anonymous cart into the user's cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use super::Layout;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{CspNonce, Shopper, clear_current_user, set_current_user};
use crate::models::{CartOwner, CurrentUser, User};
use crate::services::FieldErrors;
use crate::services::auth::{AuthError, AuthService, Registration};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub password_confirm: String,
}

/// Query parameters for error display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub error: Option<&'static str>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub email: String,
    pub display_name: String,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

/// Message for a `?error=` code on the login page.
fn login_error_message(code: &str) -> &'static str {
    match code {
        "credentials" => "Invalid email or password.",
        "disabled" => "This account has been disabled.",
        "session" => "Your session expired. Please try again.",
        _ => "Something went wrong. Please try again.",
    }
}

/// Where to land after login.
const fn landing_page(user: &CurrentUser) -> &'static str {
    if user.role.is_staff() {
        "/admin/products"
    } else {
        "/"
    }
}

/// Log a user in: merge their anonymous cart, cycle the session id and store
/// the identity.
async fn start_session(
    state: &AppState,
    shopper: &Shopper,
    user: &User,
) -> Result<CurrentUser, AppError> {
    if let Some(CartOwner::Session(cart_session)) = shopper.owner().await? {
        state.cart().merge_on_login(cart_session, user.id).await?;
    }
    shopper.take_cart_session().await?;

    let session = shopper.session();
    session.cycle_id().await?;

    let current = CurrentUser::from(user);
    set_current_user(session, &current).await?;
    set_sentry_user(&current.id, Some(current.email.as_str()));

    tracing::info!(user_id = %current.id, role = %current.role, "User logged in");
    Ok(current)
}

// =============================================================================
// Login
// =============================================================================

/// Display the login page.
#[instrument(skip(state, shopper, nonce))]
pub async fn login_page(
    State(state): State<AppState>,
    shopper: Shopper,
    nonce: CspNonce,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(LoginTemplate {
        layout: Layout::build(&state, &shopper, nonce).await?,
        error: query.error.as_deref().map(login_error_message),
    })
}

/// Handle login form submission.
#[instrument(skip(state, shopper, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    shopper: Shopper,
    Form(form): Form<LoginForm>,
) -> Response {
    let auth = AuthService::new(state.pool());
    let user = match auth.login(&form.email, &form.password).await {
        Ok(user) => user,
        Err(AuthError::AccountDisabled) => {
            tracing::warn!("Login attempt on disabled account");
            return Redirect::to("/auth/login?error=disabled").into_response();
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::warn!("Login failed");
            return Redirect::to("/auth/login?error=credentials").into_response();
        }
        Err(e) => return AppError::from(e).into_response(),
    };

    match start_session(&state, &shopper, &user).await {
        Ok(current) => Redirect::to(landing_page(&current)).into_response(),
        Err(e) => {
            tracing::error!("Failed to start session: {e}");
            Redirect::to("/auth/login?error=session").into_response()
        }
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Display the registration page.
#[instrument(skip(state, shopper, nonce))]
pub async fn register_page(
    State(state): State<AppState>,
    shopper: Shopper,
    nonce: CspNonce,
) -> Result<impl IntoResponse, AppError> {
    Ok(RegisterTemplate {
        layout: Layout::build(&state, &shopper, nonce).await?,
        email: String::new(),
        display_name: String::new(),
        errors: FieldErrors::new(),
        error: None,
    })
}

/// Handle registration: create a customer account and log it in.
#[instrument(skip(state, shopper, nonce, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    shopper: Shopper,
    nonce: CspNonce,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let auth = AuthService::new(state.pool());
    let registration = Registration {
        email: &form.email,
        display_name: &form.display_name,
        password: &form.password,
        password_confirm: &form.password_confirm,
    };

    match auth.register(registration).await {
        Ok(user) => {
            let current = start_session(&state, &shopper, &user).await?;
            Ok(Redirect::to(landing_page(&current)).into_response())
        }
        Err(e) => {
            let Some(errors) = e.field_errors() else {
                return Err(e.into());
            };
            let page = RegisterTemplate {
                layout: Layout::build(&state, &shopper, nonce).await?,
                email: form.email,
                display_name: form.display_name,
                errors,
                error: Some("Please correct the highlighted fields.".to_string()),
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
#[instrument(skip(shopper))]
pub async fn logout(shopper: Shopper) -> Response {
    let session = shopper.session();
    if let Err(e) = clear_current_user(session).await {
        tracing::error!("Failed to clear session user: {e}");
    }
    if let Err(e) = session.cycle_id().await {
        tracing::error!("Failed to cycle session id: {e}");
    }
    clear_sentry_user();

    Redirect::to("/").into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tienda_core::{Email, Role, UserId};

    use super::*;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(1),
            email: Email::parse("ana@example.mx").unwrap(),
            display_name: "Ana".to_string(),
            role,
        }
    }

    #[test]
    fn staff_land_in_back_office() {
        assert_eq!(landing_page(&user(Role::Admin)), "/admin/products");
        assert_eq!(landing_page(&user(Role::Employee)), "/admin/products");
        assert_eq!(landing_page(&user(Role::Customer)), "/");
    }

    #[test]
    fn login_error_codes_have_messages() {
        assert_eq!(login_error_message("credentials"), "Invalid email or password.");
        assert_eq!(login_error_message("disabled"), "This account has been disabled.");
        assert_eq!(
            login_error_message("whatever"),
            "Something went wrong. Please try again."
        );
    }
}
