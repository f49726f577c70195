//! Product repository: filtered listing, detail, admin CRUD and the
//! size/tag set replacement.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use tienda_core::{LinkChanges, ProductId, Size, TagId};

use super::taxonomy::TagRow;
use super::{RepositoryError, escape_like, free_slug};
use crate::models::catalog::{Product, ProductDetail, ProductDraft, Tag};
use crate::models::listing::{ListingQuery, Page};

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.slug, p.description, p.base_price, \
                               p.image_url, p.is_active, p.created_at, p.updated_at";

/// Filter shared by the listing count and page queries.
///
/// `$1` text pattern, `$2` tag slug, `$3` category slug. A tag or category
/// filter only matches through an active link to an active tag whose
/// category is active too.
const LISTING_FILTER: &str = r"
    p.is_active
    AND ($1::text IS NULL
         OR p.name ILIKE $1 OR p.description ILIKE $1 OR p.slug ILIKE $1)
    AND (($2::text IS NULL AND $3::text IS NULL) OR EXISTS (
        SELECT 1
        FROM catalog.product_tag pt
        JOIN catalog.tag t ON t.id = pt.tag_id
        JOIN catalog.category c ON c.id = t.category_id
        WHERE pt.product_id = p.id
          AND pt.is_active AND t.is_active AND c.is_active
          AND ($2::text IS NULL OR t.slug = $2)
          AND ($3::text IS NULL OR c.slug = $3)
    ))
";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    slug: String,
    description: String,
    base_price: Decimal,
    image_url: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            slug: row.slug,
            description: row.description,
            base_price: row.base_price,
            image_url: row.image_url,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductTagRow {
    product_id: i32,
    #[sqlx(flatten)]
    tag: TagRow,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Storefront reads
    // =========================================================================

    /// One page of active products matching the listing query, plus the total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn search(&self, query: &ListingQuery) -> Result<Page<Product>, RepositoryError> {
        let pattern = query
            .text
            .as_deref()
            .map(|text| format!("%{}%", escape_like(text)));

        let count_sql = format!("SELECT COUNT(*) FROM catalog.product p WHERE {LISTING_FILTER}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(pattern.as_deref())
            .bind(query.tag.as_deref())
            .bind(query.category.as_deref())
            .fetch_one(self.pool)
            .await?;

        let page_sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product p WHERE {LISTING_FILTER} \
             ORDER BY {} LIMIT $4 OFFSET $5",
            query.sort.order_by()
        );
        let rows = sqlx::query_as::<_, ProductRow>(&page_sql)
            .bind(pattern.as_deref())
            .bind(query.tag.as_deref())
            .bind(query.category.as_deref())
            .bind(query.limit())
            .bind(query.offset())
            .fetch_all(self.pool)
            .await?;

        Ok(Page {
            items: rows.into_iter().map(Product::from).collect(),
            total,
            page: query.page,
            page_size: query.page_size,
        })
    }

    /// Newest active products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn newest(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product p \
             WHERE p.is_active ORDER BY p.created_at DESC, p.id DESC LIMIT $1"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// An active product by slug, with its active sizes and visible tags.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_active_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProductDetail>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product p WHERE p.slug = $1 AND p.is_active"
        );
        let Some(row) = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };
        let product = Product::from(row);

        let mut sizes: Vec<Size> = sqlx::query_scalar(
            "SELECT size FROM catalog.product_size WHERE product_id = $1 AND is_active",
        )
        .bind(product.id)
        .fetch_all(self.pool)
        .await?;
        sizes.sort();

        let tags = sqlx::query_as::<_, TagRow>(
            r"
            SELECT t.id, t.category_id, t.name, t.slug, t.is_active
            FROM catalog.product_tag pt
            JOIN catalog.tag t ON t.id = pt.tag_id
            JOIN catalog.category c ON c.id = t.category_id
            WHERE pt.product_id = $1 AND pt.is_active AND t.is_active AND c.is_active
            ORDER BY t.name
            ",
        )
        .bind(product.id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(ProductDetail {
            product,
            sizes,
            tags: tags.into_iter().map(Tag::from).collect(),
        }))
    }

    // =========================================================================
    // Back-office
    // =========================================================================

    /// Every product, active or not, with its active size and tag links.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_admin(&self) -> Result<Vec<ProductDetail>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM catalog.product p ORDER BY p.name, p.id");
        let products = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        let size_rows: Vec<(i32, Size)> = sqlx::query_as(
            "SELECT product_id, size FROM catalog.product_size WHERE is_active",
        )
        .fetch_all(self.pool)
        .await?;

        let tag_rows = sqlx::query_as::<_, ProductTagRow>(
            r"
            SELECT pt.product_id, t.id, t.category_id, t.name, t.slug, t.is_active
            FROM catalog.product_tag pt
            JOIN catalog.tag t ON t.id = pt.tag_id
            WHERE pt.is_active
            ORDER BY t.name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let mut sizes: HashMap<i32, Vec<Size>> = HashMap::new();
        for (product_id, size) in size_rows {
            sizes.entry(product_id).or_default().push(size);
        }
        let mut tags: HashMap<i32, Vec<Tag>> = HashMap::new();
        for row in tag_rows {
            tags.entry(row.product_id).or_default().push(row.tag.into());
        }

        Ok(products
            .into_iter()
            .map(|row| {
                let mut product_sizes = sizes.remove(&row.id).unwrap_or_default();
                product_sizes.sort();
                let product_tags = tags.remove(&row.id).unwrap_or_default();
                ProductDetail {
                    product: row.into(),
                    sizes: product_sizes,
                    tags: product_tags,
                }
            })
            .collect())
    }

    /// Create a product with a unique slug derived from its name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("product_name_key")` for a duplicate name.
    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let slug = free_slug(&mut *tx, "catalog.product", &draft.name, None, None).await?;

        let sql = format!(
            "INSERT INTO catalog.product AS p (name, slug, description, base_price, image_url) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&draft.name)
            .bind(slug)
            .bind(&draft.description)
            .bind(draft.base_price)
            .bind(draft.image_url.as_deref())
            .fetch_one(&mut *tx)
            .await
            .map_err(RepositoryError::from_unique_violation)?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Update a product. A changed name re-derives a unique slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict("product_name_key")` for a duplicate name.
    pub async fn update(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (current_name, current_slug): (String, String) =
            sqlx::query_as("SELECT name, slug FROM catalog.product WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        let slug = if current_name == draft.name {
            current_slug
        } else {
            free_slug(
                &mut *tx,
                "catalog.product",
                &draft.name,
                Some(id.as_i32()),
                None,
            )
            .await?
        };

        let sql = format!(
            "UPDATE catalog.product AS p \
             SET name = $2, slug = $3, description = $4, base_price = $5, \
                 image_url = $6, updated_at = NOW() \
             WHERE p.id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(&draft.name)
            .bind(slug)
            .bind(&draft.description)
            .bind(draft.base_price)
            .bind(draft.image_url.as_deref())
            .fetch_one(&mut *tx)
            .await
            .map_err(RepositoryError::from_unique_violation)?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Soft-delete or restore a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn set_active(&self, id: ProductId, active: bool) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE catalog.product SET is_active = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(active)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Make exactly `tag_ids` the product's active tags.
    ///
    /// Dropped links are deactivated, returning links reactivated and new
    /// ones inserted, all in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product or any tag doesn't exist.
    pub async fn replace_tags(
        &self,
        id: ProductId,
        tag_ids: &[TagId],
    ) -> Result<LinkChanges<TagId>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_product(&mut tx, id).await?;

        let mut wanted: Vec<i32> = tag_ids.iter().map(TagId::as_i32).collect();
        wanted.sort_unstable();
        wanted.dedup();
        let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog.tag WHERE id = ANY($1)")
            .bind(&wanted)
            .fetch_one(&mut *tx)
            .await?;
        if usize::try_from(known).ok() != Some(wanted.len()) {
            return Err(RepositoryError::NotFound);
        }

        let current: Vec<(TagId, bool)> = sqlx::query_as(
            "SELECT tag_id, is_active FROM catalog.product_tag WHERE product_id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let changes = LinkChanges::compute(&current, tag_ids);
        let ids = |keys: &[TagId]| keys.iter().map(TagId::as_i32).collect::<Vec<_>>();

        if !changes.deactivate.is_empty() {
            sqlx::query(
                "UPDATE catalog.product_tag SET is_active = FALSE, updated_at = NOW() \
                 WHERE product_id = $1 AND tag_id = ANY($2)",
            )
            .bind(id)
            .bind(ids(&changes.deactivate))
            .execute(&mut *tx)
            .await?;
        }
        if !changes.reactivate.is_empty() {
            sqlx::query(
                "UPDATE catalog.product_tag SET is_active = TRUE, updated_at = NOW() \
                 WHERE product_id = $1 AND tag_id = ANY($2)",
            )
            .bind(id)
            .bind(ids(&changes.reactivate))
            .execute(&mut *tx)
            .await?;
        }
        if !changes.insert.is_empty() {
            sqlx::query(
                "INSERT INTO catalog.product_tag (product_id, tag_id) \
                 SELECT $1, UNNEST($2::int4[])",
            )
            .bind(id)
            .bind(ids(&changes.insert))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(changes)
    }

    /// Make exactly `sizes` the product's offered sizes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn replace_sizes(
        &self,
        id: ProductId,
        sizes: &[Size],
    ) -> Result<LinkChanges<Size>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_product(&mut tx, id).await?;

        let current: Vec<(Size, bool)> = sqlx::query_as(
            "SELECT size, is_active FROM catalog.product_size WHERE product_id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let changes = LinkChanges::compute(&current, sizes);
        let labels = |keys: &[Size]| {
            keys.iter()
                .map(|size| size.as_str().to_owned())
                .collect::<Vec<_>>()
        };

        if !changes.deactivate.is_empty() {
            sqlx::query(
                "UPDATE catalog.product_size SET is_active = FALSE, updated_at = NOW() \
                 WHERE product_id = $1 AND size = ANY($2)",
            )
            .bind(id)
            .bind(labels(&changes.deactivate))
            .execute(&mut *tx)
            .await?;
        }
        if !changes.reactivate.is_empty() {
            sqlx::query(
                "UPDATE catalog.product_size SET is_active = TRUE, updated_at = NOW() \
                 WHERE product_id = $1 AND size = ANY($2)",
            )
            .bind(id)
            .bind(labels(&changes.reactivate))
            .execute(&mut *tx)
            .await?;
        }
        if !changes.insert.is_empty() {
            sqlx::query(
                "INSERT INTO catalog.product_size (product_id, size) \
                 SELECT $1, UNNEST($2::text[])",
            )
            .bind(id)
            .bind(labels(&changes.insert))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(changes)
    }
}

/// Lock the product row for the rest of the transaction.
async fn lock_product(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: ProductId,
) -> Result<(), RepositoryError> {
    let found: Option<i32> =
        sqlx::query_scalar("SELECT id FROM catalog.product WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
    found.map(|_| ()).ok_or(RepositoryError::NotFound)
}
