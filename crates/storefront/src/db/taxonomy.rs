//! Category and tag repository.

use std::collections::BTreeMap;

use sqlx::PgPool;

use tienda_core::{CategoryId, TagId};

use super::{RepositoryError, free_slug};
use crate::models::catalog::{Category, CategoryWithTags, Tag};

#[derive(sqlx::FromRow)]
pub(crate) struct CategoryRow {
    id: i32,
    name: String,
    slug: String,
    is_active: bool,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            slug: row.slug,
            is_active: row.is_active,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct TagRow {
    id: i32,
    category_id: i32,
    name: String,
    slug: String,
    is_active: bool,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Self {
            id: TagId::new(row.id),
            category_id: CategoryId::new(row.category_id),
            name: row.name,
            slug: row.slug,
            is_active: row.is_active,
        }
    }
}

/// Group tags under their categories, keeping the category order.
fn group_tags(categories: Vec<Category>, tags: Vec<Tag>) -> Vec<CategoryWithTags> {
    let mut by_category: BTreeMap<CategoryId, Vec<Tag>> = BTreeMap::new();
    for tag in tags {
        by_category.entry(tag.category_id).or_default().push(tag);
    }

    categories
        .into_iter()
        .map(|category| {
            let tags = by_category.remove(&category.id).unwrap_or_default();
            CategoryWithTags { category, tags }
        })
        .collect()
}

/// Repository for the category/tag taxonomy.
pub struct TaxonomyRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TaxonomyRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active categories with their active tags, for navigation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn active_tree(&self) -> Result<Vec<CategoryWithTags>, RepositoryError> {
        let categories = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, is_active FROM catalog.category WHERE is_active ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        let tags = sqlx::query_as::<_, TagRow>(
            r"
            SELECT t.id, t.category_id, t.name, t.slug, t.is_active
            FROM catalog.tag t
            JOIN catalog.category c ON c.id = t.category_id
            WHERE t.is_active AND c.is_active
            ORDER BY t.name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(group_tags(
            categories.into_iter().map(Category::from).collect(),
            tags.into_iter().map(Tag::from).collect(),
        ))
    }

    /// Every category and tag, active or not, for the back-office.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn full_tree(&self) -> Result<Vec<CategoryWithTags>, RepositoryError> {
        let categories = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, is_active FROM catalog.category ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        let tags = sqlx::query_as::<_, TagRow>(
            "SELECT id, category_id, name, slug, is_active FROM catalog.tag ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(group_tags(
            categories.into_iter().map(Category::from).collect(),
            tags.into_iter().map(Tag::from).collect(),
        ))
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Create a category with a unique slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("category_name_key")` for a duplicate name.
    pub async fn create_category(&self, name: &str) -> Result<Category, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let slug = free_slug(&mut *tx, "catalog.category", name, None, None).await?;

        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO catalog.category (name, slug)
            VALUES ($1, $2)
            RETURNING id, name, slug, is_active
            ",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(&mut *tx)
        .await
        .map_err(RepositoryError::from_unique_violation)?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Rename a category, deriving a new slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict("category_name_key")` for a duplicate name.
    pub async fn rename_category(
        &self,
        id: CategoryId,
        name: &str,
    ) -> Result<Category, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let slug = free_slug(
            &mut *tx,
            "catalog.category",
            name,
            Some(id.as_i32()),
            None,
        )
        .await?;

        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            UPDATE catalog.category
            SET name = $2, slug = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, slug, is_active
            ",
        )
        .bind(id)
        .bind(name)
        .bind(slug)
        .fetch_optional(&mut *tx)
        .await
        .map_err(RepositoryError::from_unique_violation)?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Soft-delete or restore a category. Its tags keep their own flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    pub async fn set_category_active(
        &self,
        id: CategoryId,
        active: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE catalog.category SET is_active = $2, updated_at = NOW() WHERE id = $1",
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

    // =========================================================================
    // Tags
    // =========================================================================

    /// Create a tag inside a category. Slugs are unique per category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict("tag_category_name_key")` for a duplicate name.
    pub async fn create_tag(
        &self,
        category_id: CategoryId,
        name: &str,
    ) -> Result<Tag, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i32> =
            sqlx::query_scalar("SELECT id FROM catalog.category WHERE id = $1")
                .bind(category_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let slug = free_slug(
            &mut *tx,
            "catalog.tag",
            name,
            None,
            Some(("category_id", category_id.as_i32())),
        )
        .await?;

        let row = sqlx::query_as::<_, TagRow>(
            r"
            INSERT INTO catalog.tag (category_id, name, slug)
            VALUES ($1, $2, $3)
            RETURNING id, category_id, name, slug, is_active
            ",
        )
        .bind(category_id)
        .bind(name)
        .bind(slug)
        .fetch_one(&mut *tx)
        .await
        .map_err(RepositoryError::from_unique_violation)?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Rename a tag, deriving a new slug within its category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the tag doesn't exist.
    /// Returns `RepositoryError::Conflict("tag_category_name_key")` for a duplicate name.
    pub async fn rename_tag(&self, id: TagId, name: &str) -> Result<Tag, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let category_id: i32 =
            sqlx::query_scalar("SELECT category_id FROM catalog.tag WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        let slug = free_slug(
            &mut *tx,
            "catalog.tag",
            name,
            Some(id.as_i32()),
            Some(("category_id", category_id)),
        )
        .await?;

        let row = sqlx::query_as::<_, TagRow>(
            r"
            UPDATE catalog.tag
            SET name = $2, slug = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, category_id, name, slug, is_active
            ",
        )
        .bind(id)
        .bind(name)
        .bind(slug)
        .fetch_one(&mut *tx)
        .await
        .map_err(RepositoryError::from_unique_violation)?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Soft-delete or restore a tag. Product links are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the tag doesn't exist.
    pub async fn set_tag_active(&self, id: TagId, active: bool) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE catalog.tag SET is_active = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(active)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: i32, name: &str) -> Category {
        Category {
            id: CategoryId::new(id),
            name: name.to_owned(),
            slug: name.to_lowercase(),
            is_active: true,
        }
    }

    fn tag(id: i32, category_id: i32, name: &str) -> Tag {
        Tag {
            id: TagId::new(id),
            category_id: CategoryId::new(category_id),
            name: name.to_owned(),
            slug: name.to_lowercase(),
            is_active: true,
        }
    }

    #[test]
    fn tags_are_grouped_under_their_category() {
        let tree = group_tags(
            vec![category(2, "Color"), category(1, "Estilo"), category(3, "Vacía")],
            vec![tag(10, 1, "Vintage"), tag(11, 2, "Negro"), tag(12, 1, "Anime")],
        );

        let names: Vec<(&str, Vec<&str>)> = tree
            .iter()
            .map(|node| {
                (
                    node.category.name.as_str(),
                    node.tags.iter().map(|t| t.name.as_str()).collect(),
                )
            })
            .collect();

        assert_eq!(
            names,
            vec![
                ("Color", vec!["Negro"]),
                ("Estilo", vec!["Vintage", "Anime"]),
                ("Vacía", vec![]),
            ]
        );
    }
}
