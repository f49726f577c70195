//! Staff account management. Admin only.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tienda_core::{Role, UserId};

use super::{ActiveForm, ActiveResponse};
use crate::error::{ApiResult, AppError};
use crate::filters;
use crate::middleware::{CspNonce, RequireAdmin, Shopper};
use crate::models::User;
use crate::routes::Layout;
use crate::services::FieldErrors;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Staff row for the employees page.
#[derive(Clone, Debug, Serialize)]
pub struct StaffView {
    pub id: i32,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: String,
}

impl From<&User> for StaffView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.as_i32(),
            email: user.email.to_string(),
            display_name: user.display_name.clone(),
            role: user.role.to_string(),
            is_active: user.is_active,
            created_at: user.created_at.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Employees page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/employees.html")]
pub struct AdminEmployeesTemplate {
    pub layout: Layout,
    pub staff: Vec<StaffView>,
}

/// New staff account body.
#[derive(Debug, Deserialize)]
pub struct NewEmployeeForm {
    pub email: String,
    pub display_name: String,
    pub password: String,
    /// `employee` (default) or `admin`.
    #[serde(default)]
    pub role: Option<String>,
}

impl NewEmployeeForm {
    /// The requested staff role; customers can't be created here.
    fn staff_role(&self) -> Result<Role, FieldErrors> {
        let role = match self.role.as_deref().map(str::trim) {
            None | Some("") => Role::Employee,
            Some(raw) => raw
                .parse::<Role>()
                .map_err(|e| FieldErrors::single("role", e))?,
        };
        if !role.is_staff() {
            return Err(FieldErrors::single("role", "Role must be employee or admin"));
        }
        Ok(role)
    }
}

/// `{ok, employee}`.
#[derive(Debug, Serialize)]
pub struct EmployeeResponse {
    pub ok: bool,
    pub employee: StaffView,
}

/// Display admin and employee accounts.
#[instrument(skip(state, shopper, nonce, _admin))]
pub async fn index(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    shopper: Shopper,
    nonce: CspNonce,
) -> Result<impl IntoResponse, AppError> {
    let staff = AuthService::new(state.pool()).staff().await?;

    Ok(AdminEmployeesTemplate {
        layout: Layout::build(&state, &shopper, nonce).await?,
        staff: staff.iter().map(StaffView::from).collect(),
    })
}

/// Create a staff account.
#[instrument(skip(state, admin, form), fields(user_id = %admin.0.id, email = %form.email))]
pub async fn create(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Json(form): Json<NewEmployeeForm>,
) -> ApiResult<Json<EmployeeResponse>> {
    let role = form.staff_role().map_err(AppError::Validation)?;
    let user = AuthService::new(state.pool())
        .create_account(&form.email, &form.display_name, role, &form.password)
        .await?;

    Ok(Json(EmployeeResponse {
        ok: true,
        employee: StaffView::from(&user),
    }))
}

/// Deactivate or reactivate a staff account.
#[instrument(skip(state, admin), fields(user_id = %admin.0.id))]
pub async fn set_active(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<i32>,
    Json(form): Json<ActiveForm>,
) -> ApiResult<Json<ActiveResponse>> {
    let target = UserId::new(id);
    if target == admin.0.id && !form.active {
        return Err(
            AppError::BadRequest("You can't deactivate your own account".to_string()).into(),
        );
    }

    AuthService::new(state.pool())
        .set_active(target, form.active)
        .await?;
    Ok(Json(ActiveResponse::new(form.active)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(role: Option<&str>) -> NewEmployeeForm {
        NewEmployeeForm {
            email: "staff@tiendaplayeras.mx".to_string(),
            display_name: "Staff".to_string(),
            password: "correcto-caballo".to_string(),
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn role_defaults_to_employee() {
        assert_eq!(form(None).staff_role(), Ok(Role::Employee));
        assert_eq!(form(Some(" ")).staff_role(), Ok(Role::Employee));
        assert_eq!(form(Some("admin")).staff_role(), Ok(Role::Admin));
    }

    #[test]
    fn customers_and_unknown_roles_are_rejected() {
        assert!(form(Some("customer")).staff_role().is_err());
        assert_eq!(
            form(Some("owner")).staff_role().map_err(|e| e.get("role").map(str::to_string)),
            Err(Some("invalid role: owner".to_string()))
        );
    }
}
