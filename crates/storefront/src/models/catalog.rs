//! Catalog domain types: products and their category/tag taxonomy.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use tienda_core::{CategoryId, ProductId, Size, TagId};

/// A product in the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unique, derived from the name.
    pub slug: String,
    pub description: String,
    pub base_price: Decimal,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product with its active sizes and active tags.
#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub product: Product,
    /// Smallest first.
    pub sizes: Vec<Size>,
    pub tags: Vec<Tag>,
}

/// A top-level grouping of tags (e.g. "Style", "Color").
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
}

/// A tag belonging to exactly one category.
#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    pub id: TagId,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
}

/// A category together with its tags, as shown in navigation and admin pages.
#[derive(Debug, Clone)]
pub struct CategoryWithTags {
    pub category: Category,
    pub tags: Vec<Tag>,
}

/// Validated product fields for create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub base_price: Decimal,
    pub image_url: Option<String>,
}
