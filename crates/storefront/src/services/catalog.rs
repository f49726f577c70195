//! Catalog service: storefront listing, product administration and the
//! category/tag taxonomy with its navigation cache.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;

use tienda_core::{CategoryId, LinkChanges, ProductId, Size, TagId};

use super::FieldErrors;
use crate::db::{ProductRepository, RepositoryError, TaxonomyRepository};
use crate::models::catalog::{
    Category, CategoryWithTags, Product, ProductDetail, ProductDraft, Tag,
};
use crate::models::listing::{ListingQuery, Page};

/// Maximum product, category and tag name length, in characters.
pub const MAX_NAME_LENGTH: usize = 100;

/// Largest price `NUMERIC(10,2)` can hold.
const MAX_PRICE_CENTS: i64 = 99_999_999_99;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("not found")]
    NotFound,

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(constraint) => {
                Self::Validation(FieldErrors::single("name", duplicate_message(&constraint)))
            }
            other => Self::Repository(other),
        }
    }
}

/// Friendly message for a unique-constraint violation.
fn duplicate_message(constraint: &str) -> &'static str {
    match constraint {
        "product_name_key" | "product_slug_key" => "A product with this name already exists",
        "category_name_key" | "category_slug_key" => "A category with this name already exists",
        "tag_category_name_key" | "tag_category_slug_key" => {
            "This category already has a tag with this name"
        }
        _ => "This name is already taken",
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Product create/update form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductForm {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Decimal string, e.g. `"249.00"`.
    pub base_price: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl ProductForm {
    /// Validate into a draft.
    ///
    /// # Errors
    ///
    /// Returns every failing field's message.
    pub fn validate(&self) -> Result<ProductDraft, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = match validate_name(&self.name) {
            Ok(name) => name,
            Err(message) => {
                errors.add("name", message);
                String::new()
            }
        };

        let base_price = match parse_price(&self.base_price) {
            Ok(price) => price,
            Err(message) => {
                errors.add("base_price", message);
                Decimal::ZERO
            }
        };

        let image_url = self
            .image_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty());
        if let Some(url) = image_url
            && !is_http_url(url)
        {
            errors.add("image_url", "Image URL must be an http(s) address");
        }

        errors.into_result(ProductDraft {
            name,
            description: self
                .description
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_owned(),
            base_price,
            image_url: image_url.map(str::to_owned),
        })
    }
}

/// Trim a category, tag or product name and check its length.
///
/// # Errors
///
/// Returns the user-facing message when the name is empty or too long.
pub fn validate_name(raw: &str) -> Result<String, &'static str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("Name is required");
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err("Name must be at most 100 characters");
    }
    Ok(name.to_owned())
}

fn parse_price(raw: &str) -> Result<Decimal, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("Price is required");
    }
    let price: Decimal = raw.parse().map_err(|_| "Price must be a number")?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err("Price must not be negative");
    }
    if price.scale() > 2 && price != price.round_dp(2) {
        return Err("Price can have at most two decimals");
    }
    if price > Decimal::new(MAX_PRICE_CENTS, 2) {
        return Err("Price is too large");
    }
    Ok(price.round_dp(2))
}

fn is_http_url(raw: &str) -> bool {
    url::Url::parse(raw)
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
}

/// Parse submitted size labels.
///
/// # Errors
///
/// Returns a `sizes` field error naming the first unknown label.
pub fn parse_sizes(labels: &[String]) -> Result<Vec<Size>, FieldErrors> {
    labels
        .iter()
        .map(|label| {
            label
                .parse::<Size>()
                .map_err(|e| FieldErrors::single("sizes", e.to_string()))
        })
        .collect()
}

// =============================================================================
// Taxonomy cache
// =============================================================================

/// Cache key for taxonomy lookups.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum TaxonomyKey {
    ActiveTree,
}

/// Read-through cache of the navigation taxonomy (5-minute TTL).
///
/// Admin taxonomy mutations call [`TaxonomyCache::invalidate`].
#[derive(Clone)]
pub struct TaxonomyCache {
    cache: Cache<TaxonomyKey, Arc<Vec<CategoryWithTags>>>,
}

impl Default for TaxonomyCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl TaxonomyCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().max_capacity(16).time_to_live(ttl).build(),
        }
    }

    /// Return the cached tree or load, cache and return it.
    ///
    /// Load failures are not cached.
    ///
    /// # Errors
    ///
    /// Returns the loader's error.
    pub async fn get_or_load<F, Fut>(
        &self,
        load: F,
    ) -> Result<Arc<Vec<CategoryWithTags>>, RepositoryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<CategoryWithTags>, RepositoryError>>,
    {
        if let Some(tree) = self.cache.get(&TaxonomyKey::ActiveTree).await {
            debug!("Cache hit for taxonomy");
            return Ok(tree);
        }

        let tree = Arc::new(load().await?);
        self.cache
            .insert(TaxonomyKey::ActiveTree, Arc::clone(&tree))
            .await;
        Ok(tree)
    }

    /// Drop the cached tree.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&TaxonomyKey::ActiveTree).await;
    }
}

// =============================================================================
// Service
// =============================================================================

/// Catalog service.
pub struct CatalogService<'a> {
    products: ProductRepository<'a>,
    taxonomy: TaxonomyRepository<'a>,
    cache: &'a TaxonomyCache,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a TaxonomyCache) -> Self {
        Self {
            products: ProductRepository::new(pool),
            taxonomy: TaxonomyRepository::new(pool),
            cache,
        }
    }

    /// Filtered, sorted, paginated active products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn listing(&self, query: &ListingQuery) -> Result<Page<Product>, CatalogError> {
        Ok(self.products.search(query).await?)
    }

    /// Newest active products for the home page.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn featured(&self, limit: i64) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.newest(limit).await?)
    }

    /// An active product by slug.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for unknown or inactive products.
    pub async fn product(&self, slug: &str) -> Result<ProductDetail, CatalogError> {
        self.products
            .get_active_by_slug(slug)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// Active categories with their active tags, cached.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` on a cache miss whose load fails.
    pub async fn navigation(&self) -> Result<Arc<Vec<CategoryWithTags>>, CatalogError> {
        Ok(self
            .cache
            .get_or_load(|| self.taxonomy.active_tree())
            .await?)
    }

    // =========================================================================
    // Products (back-office)
    // =========================================================================

    /// All products including inactive ones.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn admin_products(&self) -> Result<Vec<ProductDetail>, CatalogError> {
        Ok(self.products.list_for_admin().await?)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for invalid fields or a duplicate name.
    pub async fn create_product(&self, form: &ProductForm) -> Result<Product, CatalogError> {
        let draft = form.validate().map_err(CatalogError::Validation)?;
        let product = self.products.create(&draft).await?;
        tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
        Ok(product)
    }

    /// Update a product; renaming re-derives its slug.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for invalid fields or a duplicate name.
    /// Returns `CatalogError::NotFound` if the product doesn't exist.
    pub async fn update_product(
        &self,
        id: ProductId,
        form: &ProductForm,
    ) -> Result<Product, CatalogError> {
        let draft = form.validate().map_err(CatalogError::Validation)?;
        Ok(self.products.update(id, &draft).await?)
    }

    /// Soft-delete or restore a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product doesn't exist.
    pub async fn set_product_active(
        &self,
        id: ProductId,
        active: bool,
    ) -> Result<(), CatalogError> {
        Ok(self.products.set_active(id, active).await?)
    }

    /// Replace the product's active tag set.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product or a tag doesn't exist.
    pub async fn replace_tags(
        &self,
        id: ProductId,
        tag_ids: &[TagId],
    ) -> Result<LinkChanges<TagId>, CatalogError> {
        let changes = self.products.replace_tags(id, tag_ids).await?;
        debug!(product_id = %id, ?changes, "Product tags replaced");
        Ok(changes)
    }

    /// Replace the product's offered sizes.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for unknown size labels.
    /// Returns `CatalogError::NotFound` if the product doesn't exist.
    pub async fn replace_sizes(
        &self,
        id: ProductId,
        labels: &[String],
    ) -> Result<LinkChanges<Size>, CatalogError> {
        let sizes = parse_sizes(labels).map_err(CatalogError::Validation)?;
        let changes = self.products.replace_sizes(id, &sizes).await?;
        debug!(product_id = %id, ?changes, "Product sizes replaced");
        Ok(changes)
    }

    // =========================================================================
    // Taxonomy (back-office)
    // =========================================================================

    /// Every category and tag, active or not.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn admin_taxonomy(&self) -> Result<Vec<CategoryWithTags>, CatalogError> {
        Ok(self.taxonomy.full_tree().await?)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for an invalid or duplicate name.
    pub async fn create_category(&self, name: &str) -> Result<Category, CatalogError> {
        let name = checked_name(name)?;
        let category = self.taxonomy.create_category(&name).await?;
        self.cache.invalidate().await;
        Ok(category)
    }

    /// Rename a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for an invalid or duplicate name.
    /// Returns `CatalogError::NotFound` if the category doesn't exist.
    pub async fn rename_category(
        &self,
        id: CategoryId,
        name: &str,
    ) -> Result<Category, CatalogError> {
        let name = checked_name(name)?;
        let category = self.taxonomy.rename_category(id, &name).await?;
        self.cache.invalidate().await;
        Ok(category)
    }

    /// Soft-delete or restore a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the category doesn't exist.
    pub async fn set_category_active(
        &self,
        id: CategoryId,
        active: bool,
    ) -> Result<(), CatalogError> {
        self.taxonomy.set_category_active(id, active).await?;
        self.cache.invalidate().await;
        Ok(())
    }

    /// Create a tag in a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for an invalid or duplicate name.
    /// Returns `CatalogError::NotFound` if the category doesn't exist.
    pub async fn create_tag(
        &self,
        category_id: CategoryId,
        name: &str,
    ) -> Result<Tag, CatalogError> {
        let name = checked_name(name)?;
        let tag = self.taxonomy.create_tag(category_id, &name).await?;
        self.cache.invalidate().await;
        Ok(tag)
    }

    /// Rename a tag.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for an invalid or duplicate name.
    /// Returns `CatalogError::NotFound` if the tag doesn't exist.
    pub async fn rename_tag(&self, id: TagId, name: &str) -> Result<Tag, CatalogError> {
        let name = checked_name(name)?;
        let tag = self.taxonomy.rename_tag(id, &name).await?;
        self.cache.invalidate().await;
        Ok(tag)
    }

    /// Soft-delete or restore a tag.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the tag doesn't exist.
    pub async fn set_tag_active(&self, id: TagId, active: bool) -> Result<(), CatalogError> {
        self.taxonomy.set_tag_active(id, active).await?;
        self.cache.invalidate().await;
        Ok(())
    }
}

fn checked_name(raw: &str) -> Result<String, CatalogError> {
    validate_name(raw)
        .map_err(|message| CatalogError::Validation(FieldErrors::single("name", message)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn form(name: &str, price: &str) -> ProductForm {
        ProductForm {
            name: name.to_owned(),
            base_price: price.to_owned(),
            ..ProductForm::default()
        }
    }

    #[test]
    fn valid_form_produces_trimmed_draft() {
        let draft = ProductForm {
            name: "  Playera Vintage  ".to_owned(),
            description: Some(" 100% algodón ".to_owned()),
            base_price: "249.5".to_owned(),
            image_url: Some("https://cdn.example.mx/vintage.jpg".to_owned()),
        }
        .validate()
        .unwrap();

        assert_eq!(draft.name, "Playera Vintage");
        assert_eq!(draft.description, "100% algodón");
        assert_eq!(draft.base_price, Decimal::new(24_950, 2));
        assert_eq!(
            draft.image_url.as_deref(),
            Some("https://cdn.example.mx/vintage.jpg")
        );
    }

    #[test]
    fn name_is_required_and_bounded() {
        let errors = form("   ", "10").validate().unwrap_err();
        assert_eq!(errors.get("name"), Some("Name is required"));

        let errors = form(&"x".repeat(101), "10").validate().unwrap_err();
        assert_eq!(errors.get("name"), Some("Name must be at most 100 characters"));

        assert!(form(&"x".repeat(100), "10").validate().is_ok());
    }

    #[test]
    fn price_rules() {
        assert_eq!(
            form("A", "-1").validate().unwrap_err().get("base_price"),
            Some("Price must not be negative")
        );
        assert_eq!(
            form("A", "abc").validate().unwrap_err().get("base_price"),
            Some("Price must be a number")
        );
        assert_eq!(
            form("A", "1.999").validate().unwrap_err().get("base_price"),
            Some("Price can have at most two decimals")
        );
        assert_eq!(
            form("A", "").validate().unwrap_err().get("base_price"),
            Some("Price is required")
        );
        assert_eq!(form("A", "0").validate().unwrap().base_price, Decimal::ZERO);
        assert_eq!(
            form("A", "10.50").validate().unwrap().base_price,
            Decimal::new(1050, 2)
        );
    }

    #[test]
    fn every_failing_field_is_reported() {
        let errors = ProductForm {
            name: String::new(),
            base_price: "-5".to_owned(),
            image_url: Some("ftp://example.mx/a.png".to_owned()),
            ..ProductForm::default()
        }
        .validate()
        .unwrap_err();

        assert!(errors.get("name").is_some());
        assert!(errors.get("base_price").is_some());
        assert!(errors.get("image_url").is_some());
    }

    #[test]
    fn duplicate_name_maps_to_friendly_field_error() {
        let err = CatalogError::from(RepositoryError::Conflict("product_name_key".to_owned()));
        match err {
            CatalogError::Validation(errors) => assert_eq!(
                errors.get("name"),
                Some("A product with this name already exists")
            ),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            CatalogError::from(RepositoryError::NotFound),
            CatalogError::NotFound
        ));
    }

    #[test]
    fn size_labels_are_parsed() {
        let sizes = parse_sizes(&["s".to_owned(), "XL".to_owned()]).unwrap();
        assert_eq!(sizes, vec![Size::S, Size::XL]);

        let errors = parse_sizes(&["M".to_owned(), "XXXL".to_owned()]).unwrap_err();
        assert_eq!(errors.get("sizes"), Some("unknown size: XXXL"));
    }

    fn tree() -> Vec<CategoryWithTags> {
        vec![CategoryWithTags {
            category: Category {
                id: CategoryId::new(1),
                name: "Estilo".to_owned(),
                slug: "estilo".to_owned(),
                is_active: true,
            },
            tags: Vec::new(),
        }]
    }

    #[tokio::test]
    async fn taxonomy_cache_loads_once_until_invalidated() {
        let cache = TaxonomyCache::default();
        let loads = AtomicUsize::new(0);
        let load = || async {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(tree())
        };

        let first = cache.get_or_load(load).await.unwrap();
        let second = cache.get_or_load(load).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(first.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));

        cache.invalidate().await;
        cache.get_or_load(load).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn taxonomy_cache_does_not_keep_failures() {
        let cache = TaxonomyCache::default();

        let failed = cache
            .get_or_load(|| async { Err(RepositoryError::NotFound) })
            .await;
        assert!(failed.is_err());

        let loaded = cache.get_or_load(|| async { Ok(tree()) }).await.unwrap();
        assert_eq!(loaded[0].category.slug, "estilo");
    }
}
