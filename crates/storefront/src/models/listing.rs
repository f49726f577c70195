//! Product listing query: filters, sort key and pagination.

use serde::Deserialize;

/// Smallest page size a client may request.
pub const MIN_PAGE_SIZE: u32 = 10;
/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: u32 = 100;
/// Page size when none is requested.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Sort order of a product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    NameAsc,
    NameDesc,
    PriceAsc,
    PriceDesc,
    IdAsc,
    IdDesc,
}

impl SortKey {
    pub const ALL: [Self; 6] = [
        Self::NameAsc,
        Self::NameDesc,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::IdAsc,
        Self::IdDesc,
    ];

    /// Parse a query-string sort key. Missing or unknown keys sort by name.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        raw.map(str::trim)
            .and_then(|key| Self::ALL.into_iter().find(|sort| sort.as_str() == key))
            .unwrap_or_default()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NameAsc => "name_asc",
            Self::NameDesc => "name_desc",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::IdAsc => "id_asc",
            Self::IdDesc => "id_desc",
        }
    }

    /// Label for the sort dropdown.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NameAsc => "Name (A-Z)",
            Self::NameDesc => "Name (Z-A)",
            Self::PriceAsc => "Price (low to high)",
            Self::PriceDesc => "Price (high to low)",
            Self::IdAsc => "Oldest",
            Self::IdDesc => "Newest",
        }
    }

    /// `ORDER BY` clause over the `p` product alias. Ties break on id.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::NameAsc => "p.name ASC, p.id ASC",
            Self::NameDesc => "p.name DESC, p.id DESC",
            Self::PriceAsc => "p.base_price ASC, p.id ASC",
            Self::PriceDesc => "p.base_price DESC, p.id DESC",
            Self::IdAsc => "p.id ASC",
            Self::IdDesc => "p.id DESC",
        }
    }
}

/// Raw listing parameters as they arrive in the query string.
///
/// Numbers are kept as strings so malformed values fall back to defaults
/// instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingParams {
    pub q: Option<String>,
    pub tag: Option<String>,
    pub category: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub sort: Option<String>,
}

/// A normalized listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    /// Case-insensitive substring matched against name, description and slug.
    pub text: Option<String>,
    pub tag: Option<String>,
    pub category: Option<String>,
    /// 1-based.
    pub page: u32,
    /// Within `[MIN_PAGE_SIZE, MAX_PAGE_SIZE]`.
    pub page_size: u32,
    pub sort: SortKey,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            text: None,
            tag: None,
            category: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: SortKey::NameAsc,
        }
    }
}

impl From<ListingParams> for ListingQuery {
    fn from(params: ListingParams) -> Self {
        let page = parse_number(params.page.as_deref()).map_or(1, |page| page.max(1));
        let page_size = parse_number(params.page_size.as_deref())
            .map_or(DEFAULT_PAGE_SIZE, clamp_page_size);

        Self {
            text: non_blank(params.q),
            tag: non_blank(params.tag),
            category: non_blank(params.category),
            page,
            page_size,
            sort: SortKey::parse(params.sort.as_deref()),
        }
    }
}

impl ListingQuery {
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

/// Clamp a requested page size into `[MIN_PAGE_SIZE, MAX_PAGE_SIZE]`.
#[must_use]
pub fn clamp_page_size(requested: u32) -> u32 {
    requested.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
}

/// Parse a query-string number. Negative values become 0, junk becomes `None`.
fn parse_number(raw: Option<&str>) -> Option<u32> {
    let value: i64 = raw?.trim().parse().ok()?;
    Some(u32::try_from(value.max(0)).unwrap_or(u32::MAX))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// One page of results plus the total match count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    /// Number of pages needed for `total` results (at least 1).
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        if self.total <= 0 || self.page_size == 0 {
            return 1;
        }
        let pages = (self.total + i64::from(self.page_size) - 1) / i64::from(self.page_size);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<&str>, page_size: Option<&str>) -> ListingParams {
        ListingParams {
            page: page.map(str::to_owned),
            page_size: page_size.map(str::to_owned),
            ..ListingParams::default()
        }
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(ListingQuery::from(params(None, Some("3"))).page_size, 10);
        assert_eq!(ListingQuery::from(params(None, Some("500"))).page_size, 100);
        assert_eq!(ListingQuery::from(params(None, Some("25"))).page_size, 25);
        assert_eq!(ListingQuery::from(params(None, Some("-4"))).page_size, 10);
        assert_eq!(ListingQuery::from(params(None, None)).page_size, 12);
        assert_eq!(ListingQuery::from(params(None, Some("lots"))).page_size, 12);
    }

    #[test]
    fn page_is_at_least_one() {
        assert_eq!(ListingQuery::from(params(Some("0"), None)).page, 1);
        assert_eq!(ListingQuery::from(params(Some("-2"), None)).page, 1);
        assert_eq!(ListingQuery::from(params(Some("x"), None)).page, 1);
        assert_eq!(ListingQuery::from(params(Some("3"), None)).page, 3);
    }

    #[test]
    fn offset_follows_page() {
        let query = ListingQuery::from(params(Some("3"), Some("20")));
        assert_eq!(query.limit(), 20);
        assert_eq!(query.offset(), 40);
    }

    #[test]
    fn unknown_sort_falls_back_to_name() {
        assert_eq!(SortKey::parse(Some("price_desc")), SortKey::PriceDesc);
        assert_eq!(SortKey::parse(Some("popularity")), SortKey::NameAsc);
        assert_eq!(SortKey::parse(None), SortKey::NameAsc);
    }

    #[test]
    fn blank_filters_are_dropped() {
        let query = ListingQuery::from(ListingParams {
            q: Some("   ".to_owned()),
            tag: Some(" vintage ".to_owned()),
            ..ListingParams::default()
        });
        assert_eq!(query.text, None);
        assert_eq!(query.tag.as_deref(), Some("vintage"));
        assert_eq!(query.category, None);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = Page::<()> {
            items: Vec::new(),
            total: 25,
            page: 1,
            page_size: 12,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        assert!(!page.has_previous());

        let empty = Page::<()> {
            items: Vec::new(),
            total: 0,
            page: 1,
            page_size: 12,
        };
        assert_eq!(empty.total_pages(), 1);
        assert!(!empty.has_next());
    }
}
