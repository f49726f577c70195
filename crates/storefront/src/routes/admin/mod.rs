//! Back-office handlers.
//!
//! Pages render HTML; every mutation takes a JSON body and answers with a
//! `{ok: bool, ...}` envelope. Admins and employees manage the catalog and
//! orders; only admins manage employees.
//!
//! ```text
//! GET  /admin/products                     - Product list (includes inactive)
//! POST /admin/products                     - Create
//! POST /admin/products/{id}                - Update
//! POST /admin/products/{id}/active         - Deactivate / reactivate
//! POST /admin/products/{id}/tags           - Replace tag set
//! POST /admin/products/{id}/sizes          - Replace size set
//! GET  /admin/tags                         - Categories and tags
//! POST /admin/categories                   - Create category
//! POST /admin/categories/{id}              - Rename category
//! POST /admin/categories/{id}/active       - Deactivate / reactivate
//! POST /admin/tags                         - Create tag
//! POST /admin/tags/{id}                    - Rename tag
//! POST /admin/tags/{id}/active             - Deactivate / reactivate
//! GET  /admin/orders                       - Orders (status filter, paginated)
//! POST /admin/orders/{id}/status           - Change status
//! GET  /admin/employees                    - Staff list (admin only)
//! POST /admin/employees                    - Create staff account (admin only)
//! POST /admin/employees/{id}/active        - Deactivate / reactivate (admin only)
//! ```

pub mod employees;
pub mod orders;
pub mod products;
pub mod taxonomy;

use axum::{
    Router,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Body of every `.../active` endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ActiveForm {
    pub active: bool,
}

/// Body of rename/create endpoints that only carry a name.
#[derive(Debug, Clone, Deserialize)]
pub struct NameForm {
    pub name: String,
}

/// `{ok, active}`.
#[derive(Debug, Serialize)]
pub struct ActiveResponse {
    pub ok: bool,
    pub active: bool,
}

impl ActiveResponse {
    #[must_use]
    pub const fn new(active: bool) -> Self {
        Self { ok: true, active }
    }
}

/// Create the back-office router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index).post(products::create))
        .route("/products/{id}", post(products::update))
        .route("/products/{id}/active", post(products::set_active))
        .route("/products/{id}/tags", post(products::replace_tags))
        .route("/products/{id}/sizes", post(products::replace_sizes))
        .route("/tags", get(taxonomy::index).post(taxonomy::create_tag))
        .route("/tags/{id}", post(taxonomy::rename_tag))
        .route("/tags/{id}/active", post(taxonomy::set_tag_active))
        .route("/categories", post(taxonomy::create_category))
        .route("/categories/{id}", post(taxonomy::rename_category))
        .route("/categories/{id}/active", post(taxonomy::set_category_active))
        .route("/orders", get(orders::index))
        .route("/orders/{id}/status", post(orders::update_status))
        .route("/employees", get(employees::index).post(employees::create))
        .route("/employees/{id}/active", post(employees::set_active))
}
