//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! categories:
//!   - name: Style
//!     tags: [Vintage, Minimal]
//!   - name: Theme
//!     tags: [Music, Sports]
//! products:
//!   - name: Vintage Rock Tee
//!     price: "349.00"
//!     description: Washed black cotton.
//!     image_url: https://cdn.example.mx/rock.jpg
//!     sizes: [S, M, L, XL]
//!     tags: [Vintage, Music]
//! ```
//!
//! Seeding is additive: categories and tags whose name already exists are
//! reused, products whose name already exists are skipped.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use tienda_core::{CategoryId, TagId};
use tienda_storefront::services::catalog::{
    CatalogError, CatalogService, ProductForm, TaxonomyCache, parse_sizes,
};

use super::{CommandError, connect};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid seed file:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),

    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Top-level seed document.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

#[derive(Debug, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductSeed {
    pub name: String,
    /// Decimal string, e.g. `"349.00"`.
    pub price: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    /// Tag names declared under `categories`.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ProductSeed {
    fn form(&self) -> ProductForm {
        ProductForm {
            name: self.name.clone(),
            description: self.description.clone(),
            base_price: self.price.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl CatalogSeed {
    /// Check the document without touching the database.
    ///
    /// Returns one message per problem.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut declared_tags = HashSet::new();

        for category in &self.categories {
            if category.name.trim().is_empty() {
                problems.push("category with an empty name".to_owned());
            }
            for tag in &category.tags {
                if !declared_tags.insert(key(tag)) {
                    problems.push(format!("tag '{tag}' is declared more than once"));
                }
            }
        }

        for product in &self.products {
            if let Err(errors) = product.form().validate() {
                problems.push(format!("product '{}': {errors}", product.name));
            }
            if let Err(errors) = parse_sizes(&product.sizes) {
                problems.push(format!("product '{}': {errors}", product.name));
            }
            for tag in &product.tags {
                if !declared_tags.contains(&key(tag)) {
                    problems.push(format!(
                        "product '{}': tag '{tag}' is not declared under categories",
                        product.name
                    ));
                }
            }
        }

        problems
    }
}

/// Seed categories, tags and products from `file_path`.
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, or a database
/// operation fails.
pub async fn catalog(file_path: &str) -> Result<(), SeedError> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::FileNotFound(file_path.to_owned()));
    }

    info!(path = %file_path, "Loading catalog seed");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;

    let problems = seed.validate();
    if !problems.is_empty() {
        return Err(SeedError::Invalid(problems));
    }
    info!(
        categories = seed.categories.len(),
        products = seed.products.len(),
        "Seed file is valid"
    );

    let pool = connect().await?;
    let cache = TaxonomyCache::default();
    let catalog = CatalogService::new(&pool, &cache);

    let tag_ids = seed_taxonomy(&catalog, &seed.categories).await?;

    let existing: HashSet<String> = catalog
        .admin_products()
        .await?
        .into_iter()
        .map(|detail| key(&detail.product.name))
        .collect();

    let mut created = 0_usize;
    for product in &seed.products {
        if existing.contains(&key(&product.name)) {
            warn!(name = %product.name, "Product already exists, skipping");
            continue;
        }

        let row = catalog.create_product(&product.form()).await?;
        catalog.replace_sizes(row.id, &product.sizes).await?;

        let tags: Vec<TagId> = product
            .tags
            .iter()
            .filter_map(|name| tag_ids.get(&key(name)).copied())
            .collect();
        catalog.replace_tags(row.id, &tags).await?;

        info!(id = %row.id, slug = %row.slug, "Product created");
        created += 1;
    }

    info!(created, "Catalog seed complete!");
    Ok(())
}

/// Create missing categories and tags. Returns tag ids keyed by lowercase name.
async fn seed_taxonomy(
    catalog: &CatalogService<'_>,
    categories: &[CategorySeed],
) -> Result<HashMap<String, TagId>, SeedError> {
    let tree = catalog.admin_taxonomy().await?;

    let mut category_ids: HashMap<String, CategoryId> = tree
        .iter()
        .map(|group| (key(&group.category.name), group.category.id))
        .collect();
    let mut tag_ids: HashMap<String, TagId> = tree
        .iter()
        .flat_map(|group| &group.tags)
        .map(|tag| (key(&tag.name), tag.id))
        .collect();

    for category in categories {
        let category_id = match category_ids.get(&key(&category.name)) {
            Some(id) => *id,
            None => {
                let created = catalog.create_category(&category.name).await?;
                info!(name = %created.name, "Category created");
                category_ids.insert(key(&created.name), created.id);
                created.id
            }
        };

        for tag in &category.tags {
            if tag_ids.contains_key(&key(tag)) {
                continue;
            }
            let created = catalog.create_tag(category_id, tag).await?;
            info!(name = %created.name, "Tag created");
            tag_ids.insert(key(&created.name), created.id);
        }
    }

    Ok(tag_ids)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
categories:
  - name: Style
    tags: [Vintage, Minimal]
products:
  - name: Vintage Rock Tee
    price: "349.00"
    sizes: [S, M, L]
    tags: [vintage]
"#;

    #[test]
    fn sample_document_is_valid() {
        let seed: CatalogSeed = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(seed.categories.len(), 1);
        assert_eq!(seed.products.first().unwrap().sizes, vec!["S", "M", "L"]);
        assert!(seed.validate().is_empty());
    }

    #[test]
    fn undeclared_tags_and_bad_sizes_are_reported() {
        let seed: CatalogSeed = serde_yaml::from_str(
            r#"
products:
  - name: Tee
    price: "100"
    sizes: [XXXL]
    tags: [Unknown]
"#,
        )
        .unwrap();
        let problems = seed.validate();
        assert_eq!(problems.len(), 2);
        assert!(problems.iter().any(|p| p.contains("Unknown")));
    }

    #[test]
    fn invalid_price_is_reported() {
        let seed: CatalogSeed = serde_yaml::from_str(
            r#"
products:
  - name: Tee
    price: "-5"
"#,
        )
        .unwrap();
        assert_eq!(seed.validate().len(), 1);
    }

    #[test]
    fn duplicate_tag_names_are_reported() {
        let seed: CatalogSeed = serde_yaml::from_str(
            r#"
categories:
  - name: Style
    tags: [Vintage]
  - name: Era
    tags: [vintage]
"#,
        )
        .unwrap();
        assert_eq!(seed.validate().len(), 1);
    }
}
