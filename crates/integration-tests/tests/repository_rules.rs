//! Repository SQL against a migrated database.
//!
//! Requires `tienda-cli migrate` on the database named by
//! `TIENDA_TEST_DATABASE_URL`. Every test creates its own uniquely named
//! rows, so the database does not need to be empty.
//!
//! Run with: `cargo test -p tienda-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use tienda_core::{CartLineId, ProductId, Role, Size, TagId};
use tienda_integration_tests::{live_pool, unique_name};
use tienda_storefront::config::ShopConfig;
use tienda_storefront::db::CartRepository;
use tienda_storefront::models::{Cart, CartLine, CartOwner, ListingQuery, Product, Tag};
use tienda_storefront::services::auth::AuthService;
use tienda_storefront::services::cart::CartService;
use tienda_storefront::services::catalog::{CatalogService, ProductForm, TaxonomyCache};
use tienda_storefront::services::checkout::CheckoutService;
use tienda_storefront::services::orders::OrderService;

async fn product(catalog: &CatalogService<'_>, price: &str) -> Product {
    let product = catalog
        .create_product(&ProductForm {
            name: unique_name("Playera"),
            base_price: price.to_owned(),
            ..ProductForm::default()
        })
        .await
        .unwrap();
    catalog
        .replace_sizes(product.id, &["M".to_owned(), "L".to_owned()])
        .await
        .unwrap();
    product
}

async fn tags(catalog: &CatalogService<'_>, count: usize) -> (String, Vec<Tag>) {
    let category = catalog.create_category(&unique_name("Estilo")).await.unwrap();
    let mut created = Vec::new();
    for _ in 0..count {
        created.push(
            catalog
                .create_tag(category.id, &unique_name("Tag"))
                .await
                .unwrap(),
        );
    }
    (category.slug, created)
}

/// `(tag_id, is_active)` link rows of a product, by tag id.
async fn tag_links(pool: &PgPool, product_id: ProductId) -> Vec<(i32, bool)> {
    sqlx::query_as(
        "SELECT tag_id, is_active FROM catalog.product_tag \
         WHERE product_id = $1 ORDER BY tag_id",
    )
    .bind(product_id.as_i32())
    .fetch_all(pool)
    .await
    .unwrap()
}

async fn matching(
    catalog: &CatalogService<'_>,
    tag: Option<&str>,
    category: Option<&str>,
) -> i64 {
    let query = ListingQuery {
        tag: tag.map(str::to_owned),
        category: category.map(str::to_owned),
        ..ListingQuery::default()
    };
    catalog.listing(&query).await.unwrap().total
}

// =============================================================================
// Taxonomy and link sets
// =============================================================================

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_deactivated_tag_and_category_hide_products_but_keep_links() {
    let pool = live_pool().await;
    let cache = TaxonomyCache::default();
    let catalog = CatalogService::new(&pool, &cache);

    let tee = product(&catalog, "299.00").await;
    let (category_slug, created) = tags(&catalog, 1).await;
    let tag = &created[0];
    catalog.replace_tags(tee.id, &[tag.id]).await.unwrap();

    assert_eq!(matching(&catalog, Some(&tag.slug), None).await, 1);
    assert_eq!(matching(&catalog, None, Some(&category_slug)).await, 1);

    catalog.set_tag_active(tag.id, false).await.unwrap();
    assert_eq!(matching(&catalog, Some(&tag.slug), None).await, 0);
    assert_eq!(matching(&catalog, None, Some(&category_slug)).await, 0);
    assert_eq!(
        tag_links(&pool, tee.id).await,
        vec![(tag.id.as_i32(), true)],
        "the link row outlives the tag"
    );

    catalog.set_tag_active(tag.id, true).await.unwrap();
    let category_id = catalog
        .admin_taxonomy()
        .await
        .unwrap()
        .into_iter()
        .find(|group| group.category.slug == category_slug)
        .unwrap()
        .category
        .id;
    catalog.set_category_active(category_id, false).await.unwrap();
    assert_eq!(matching(&catalog, Some(&tag.slug), None).await, 0);
    assert_eq!(tag_links(&pool, tee.id).await.len(), 1);
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_replacing_tags_twice_leaves_exactly_the_last_set_active() {
    let pool = live_pool().await;
    let cache = TaxonomyCache::default();
    let catalog = CatalogService::new(&pool, &cache);

    let tee = product(&catalog, "349.00").await;
    let (_, created) = tags(&catalog, 3).await;
    let ids: Vec<TagId> = created.iter().map(|tag| tag.id).collect();
    let (a, b, c) = (ids[0], ids[1], ids[2]);

    catalog.replace_tags(tee.id, &[a, b]).await.unwrap();
    catalog.replace_tags(tee.id, &[b, c]).await.unwrap();

    let links = tag_links(&pool, tee.id).await;
    let active: Vec<i32> = links
        .iter()
        .filter(|(_, active)| *active)
        .map(|(id, _)| *id)
        .collect();
    assert_eq!(active, vec![b.as_i32(), c.as_i32()]);
    assert_eq!(links.len(), 3, "dropped link kept as history");

    let changes = catalog.replace_tags(tee.id, &[c, a]).await.unwrap();
    assert_eq!(changes.deactivate, vec![b]);
    assert_eq!(changes.reactivate, vec![a]);
    assert!(changes.insert.is_empty());
    assert_eq!(tag_links(&pool, tee.id).await.len(), 3);
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_login_merge_uses_current_prices_and_drops_unavailable_lines() {
    let pool = live_pool().await;
    let cache = TaxonomyCache::default();
    let catalog = CatalogService::new(&pool, &cache);
    let lines = CartRepository::new(&pool);

    let kept = product(&catalog, "100.00").await;
    let retired = product(&catalog, "50.00").await;

    let session = CartOwner::Session(Uuid::new_v4());
    lines.add(&session, kept.id, Size::M, 1).await.unwrap();
    lines.add(&session, retired.id, Size::M, 1).await.unwrap();

    catalog
        .update_product(
            kept.id,
            &ProductForm {
                name: kept.name.clone(),
                base_price: "150.00".to_owned(),
                ..ProductForm::default()
            },
        )
        .await
        .unwrap();
    catalog.set_product_active(retired.id, false).await.unwrap();

    let email = format!("{}@tiendaplayeras.mx", Uuid::new_v4().simple());
    let user = AuthService::new(&pool)
        .create_account(&email, "Cliente", Role::Customer, "suficiente-segura")
        .await
        .unwrap();
    let owner = CartOwner::User(user.id);
    lines.add(&owner, kept.id, Size::M, 1).await.unwrap();

    let moved = lines
        .merge_session_into_user(session.session_id().unwrap(), user.id)
        .await
        .unwrap();
    assert_eq!(moved, 1);

    let cart = lines.list(&owner).await.unwrap();
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].product_id, kept.id);
    assert_eq!(cart.lines[0].quantity, 2);
    assert_eq!(cart.lines[0].unit_price, Decimal::new(150, 0));
    assert_eq!(lines.count(&session).await.unwrap(), 0);
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_checkout_clears_only_the_ordered_lines() {
    let pool = live_pool().await;
    let cache = TaxonomyCache::default();
    let catalog = CatalogService::new(&pool, &cache);
    let cart = CartService::new(&pool);
    let lines = CartRepository::new(&pool);

    let ordered = product(&catalog, "249.00").await;
    let late = product(&catalog, "199.00").await;
    let owner = CartOwner::Session(Uuid::new_v4());

    lines.add(&owner, ordered.id, Size::L, 2).await.unwrap();
    let snapshot = cart.cart(&owner).await.unwrap();

    // Added from another tab while checkout was running.
    lines.add(&owner, late.id, Size::M, 1).await.unwrap();

    CheckoutService::new(&pool, &ShopConfig::default())
        .place_order(owner, &snapshot, Some("Av. Juárez 10, CDMX"))
        .await
        .unwrap();
    assert_eq!(cart.clear_ordered(&owner, &snapshot).await.unwrap(), 1);

    let left = cart.cart(&owner).await.unwrap();
    assert_eq!(left.lines.len(), 1);
    assert_eq!(left.lines[0].product_id, late.id);
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_failed_checkout_stores_nothing() {
    let pool = live_pool().await;
    let cache = TaxonomyCache::default();
    let catalog = CatalogService::new(&pool, &cache);
    let tee = product(&catalog, "299.00").await;
    let owner = CartOwner::Session(Uuid::new_v4());

    let line = |product_id: ProductId| CartLine {
        id: CartLineId::new(1),
        product_id,
        product_name: "Playera".to_owned(),
        product_slug: "playera".to_owned(),
        image_url: None,
        size: Size::M,
        quantity: 1,
        unit_price: Decimal::new(299, 0),
    };
    // The second item references no product, so its insert fails.
    let cart = Cart {
        lines: vec![line(tee.id), line(ProductId::new(i32::MAX))],
    };

    let placed = CheckoutService::new(&pool, &ShopConfig::default())
        .place_order(owner, &cart, None)
        .await;
    assert!(placed.is_err());
    assert!(
        OrderService::new(&pool)
            .for_owner(&owner)
            .await
            .unwrap()
            .is_empty()
    );
}
