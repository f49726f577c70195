//! Database operations for the storefront `PostgreSQL`.
//!
//! # Schemas
//!
//! - `tienda` - `user`, `user_password`
//! - `catalog` - `product`, `product_size`, `category`, `tag`, `product_tag`
//! - `sales` - `cart_line`, `order`, `order_item`, `order_status_event`
//! - `tower_sessions` - Session storage
//!
//! Every business table soft-deletes through an `is_active` column.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p tienda-cli -- migrate
//! ```

pub mod cart;
pub mod orders;
pub mod products;
pub mod taxonomy;
pub mod users;

use std::collections::HashSet;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use tienda_core::{slugify, unique_slug};

pub use cart::CartRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use taxonomy::TaxonomyRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation. Carries the constraint name when known.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict(constraint_name)`.
    pub(crate) fn from_unique_violation(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            let constraint = db_err.constraint().unwrap_or("unique").to_owned();
            return Self::Conflict(constraint);
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Escape `%`, `_` and `\` so user input matches literally inside `LIKE`.
#[must_use]
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Slugs already in use that could collide with `base` or its suffixed forms.
///
/// `table` must be a trusted, schema-qualified table name. `scope` restricts
/// the search to rows whose trusted column equals the given id (tags are only
/// unique within their category).
async fn taken_slugs<'e, E>(
    executor: E,
    table: &str,
    base: &str,
    exclude_id: Option<i32>,
    scope: Option<(&str, i32)>,
) -> Result<HashSet<String>, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let scope_sql = scope.map_or_else(String::new, |(column, _)| format!("AND {column} = $4"));
    let sql = format!(
        "SELECT slug FROM {table} \
         WHERE (slug = $1 OR slug LIKE $2) \
           AND ($3::int4 IS NULL OR id <> $3) {scope_sql}"
    );
    let pattern = format!("{}-%", escape_like(base));

    let mut query = sqlx::query_scalar::<_, String>(&sql)
        .bind(base)
        .bind(pattern)
        .bind(exclude_id);
    if let Some((_, scope_id)) = scope {
        query = query.bind(scope_id);
    }

    let slugs = query.fetch_all(executor).await?;
    Ok(slugs.into_iter().collect())
}

/// Pick a free slug for `name` in `table`.
async fn free_slug<'e, E>(
    executor: E,
    table: &str,
    name: &str,
    exclude_id: Option<i32>,
    scope: Option<(&str, i32)>,
) -> Result<String, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let mut base = slugify(name);
    if base.is_empty() {
        base.push_str("item");
    }
    let taken = taken_slugs(executor, table, &base, exclude_id, scope).await?;
    Ok(unique_slug(&base, |candidate| taken.contains(candidate)))
}
