//! Product listing and detail handlers.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tracing::instrument;
use url::form_urlencoded;

use tienda_core::{CurrencyCode, Size};

use super::{Layout, format_money};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{CspNonce, Shopper};
use crate::models::catalog::{CategoryWithTags, Product, ProductDetail, Tag};
use crate::models::listing::{ListingParams, ListingQuery, Page, SortKey};
use crate::state::AppState;

/// Product card/detail data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: String,
    pub image_url: Option<String>,
}

impl ProductView {
    #[must_use]
    pub fn from_product(product: &Product, currency: CurrencyCode) -> Self {
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            slug: product.slug.clone(),
            description: product.description.clone(),
            price: format_money(currency, product.base_price),
            image_url: product.image_url.clone(),
        }
    }
}

/// A sort dropdown option.
#[derive(Clone)]
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Pagination links for the listing.
#[derive(Clone, Default)]
pub struct Pagination {
    pub page: u32,
    pub total_pages: u32,
    pub total: i64,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub layout: Layout,
    pub nav: Arc<Vec<CategoryWithTags>>,
    pub products: Vec<ProductView>,
    pub q: String,
    pub tag: String,
    pub category: String,
    pub page_size: u32,
    pub sort_options: Vec<SortOption>,
    pub pagination: Pagination,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub product: ProductView,
    pub sizes: Vec<&'static str>,
    pub tags: Vec<Tag>,
}

/// Query string for a listing page, keeping every active filter.
fn listing_url(query: &ListingQuery, page: u32) -> String {
    let mut params = form_urlencoded::Serializer::new(String::new());
    if let Some(text) = &query.text {
        params.append_pair("q", text);
    }
    if let Some(tag) = &query.tag {
        params.append_pair("tag", tag);
    }
    if let Some(category) = &query.category {
        params.append_pair("category", category);
    }
    if query.sort != SortKey::default() {
        params.append_pair("sort", query.sort.as_str());
    }
    params.append_pair("page", &page.to_string());
    params.append_pair("page_size", &query.page_size.to_string());
    format!("/products?{}", params.finish())
}

fn pagination<T>(query: &ListingQuery, page: &Page<T>) -> Pagination {
    Pagination {
        page: page.page,
        total_pages: page.total_pages(),
        total: page.total,
        prev_url: page
            .has_previous()
            .then(|| listing_url(query, page.page - 1)),
        next_url: page.has_next().then(|| listing_url(query, page.page + 1)),
    }
}

/// Display the filtered product listing.
#[instrument(skip(state, shopper, nonce, params))]
pub async fn index(
    State(state): State<AppState>,
    shopper: Shopper,
    nonce: CspNonce,
    Query(params): Query<ListingParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = ListingQuery::from(params);
    let catalog = state.catalog();
    let currency = state.config().shop.currency;

    let page = catalog.listing(&query).await?;
    let nav = catalog.navigation().await?;

    Ok(ProductsIndexTemplate {
        layout: Layout::build(&state, &shopper, nonce).await?,
        nav,
        products: page
            .items
            .iter()
            .map(|p| ProductView::from_product(p, currency))
            .collect(),
        pagination: pagination(&query, &page),
        q: query.text.clone().unwrap_or_default(),
        tag: query.tag.clone().unwrap_or_default(),
        category: query.category.clone().unwrap_or_default(),
        page_size: query.page_size,
        sort_options: SortKey::ALL
            .into_iter()
            .map(|sort| SortOption {
                value: sort.as_str(),
                label: sort.label(),
                selected: sort == query.sort,
            })
            .collect(),
    })
}

/// Display a product.
#[instrument(skip(state, shopper, nonce))]
pub async fn show(
    State(state): State<AppState>,
    shopper: Shopper,
    nonce: CspNonce,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ProductDetail {
        product,
        sizes,
        tags,
    } = state.catalog().product(&slug).await?;

    crate::error::add_breadcrumb("catalog", "Viewed product", Some(&[("slug", &slug)]));

    Ok(ProductShowTemplate {
        layout: Layout::build(&state, &shopper, nonce).await?,
        product: ProductView::from_product(&product, state.config().shop.currency),
        sizes: sizes.into_iter().map(Size::as_str).collect(),
        tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> ListingQuery {
        ListingQuery {
            text: Some("rock & roll".to_string()),
            tag: Some("vintage".to_string()),
            ..ListingQuery::default()
        }
    }

    #[test]
    fn listing_url_keeps_filters_and_encodes() {
        let url = listing_url(&query(), 2);
        assert_eq!(
            url,
            "/products?q=rock+%26+roll&tag=vintage&page=2&page_size=12"
        );
    }

    #[test]
    fn listing_url_includes_non_default_sort() {
        let query = ListingQuery {
            sort: SortKey::PriceDesc,
            ..ListingQuery::default()
        };
        assert_eq!(
            listing_url(&query, 1),
            "/products?sort=price_desc&page=1&page_size=12"
        );
    }

    #[test]
    fn pagination_links_only_when_pages_exist() {
        let page: Page<()> = Page {
            items: Vec::new(),
            total: 30,
            page: 2,
            page_size: 12,
        };
        let links = pagination(&query(), &page);
        assert_eq!(links.total_pages, 3);
        assert!(links.prev_url.is_some_and(|u| u.contains("page=1")));
        assert!(links.next_url.is_some_and(|u| u.contains("page=3")));

        let first: Page<()> = Page {
            items: Vec::new(),
            total: 5,
            page: 1,
            page_size: 12,
        };
        let links = pagination(&query(), &first);
        assert!(links.prev_url.is_none());
        assert!(links.next_url.is_none());
    }
}
