use axum::http::{HeaderMap, HeaderValue};
use sqlx::{QueryBuilder, Sqlite};

use crate::error::ApiError;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// A sort order already resolved against an entity's sortable columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub direction: Direction,
}

/// Page request parsed from `page`, `size` and `sort` query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pageable {
    pub page: u32,
    pub size: u32,
    pub orders: Vec<Order>,
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            orders: Vec::new(),
        }
    }
}

impl Pageable {
    pub fn of(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.clamp(1, MAX_PAGE_SIZE),
            orders: Vec::new(),
        }
    }

    /// Parse paging parameters. `sortable` maps the property names clients
    /// may sort by to SQL columns; anything else is rejected.
    pub fn from_params(
        params: &[(String, String)],
        sortable: &[(&str, &'static str)],
    ) -> Result<Self, ApiError> {
        let mut pageable = Pageable::default();

        for (key, value) in params {
            match key.as_str() {
                "page" => {
                    pageable.page = value.parse().map_err(|_| {
                        ApiError::bad_request(
                            format!("Invalid page number '{}'", value),
                            "pagination",
                            "invalidpage",
                        )
                    })?;
                }
                "size" => {
                    let size: u32 = value.parse().map_err(|_| {
                        ApiError::bad_request(
                            format!("Invalid page size '{}'", value),
                            "pagination",
                            "invalidpage",
                        )
                    })?;
                    pageable.size = size.clamp(1, MAX_PAGE_SIZE);
                }
                "sort" => {
                    let mut parts = value.split(',').map(str::trim);
                    let property = parts.next().unwrap_or_default();
                    let direction = match parts.next().map(|d| d.to_ascii_lowercase()) {
                        None => Direction::Asc,
                        Some(d) if d == "asc" => Direction::Asc,
                        Some(d) if d == "desc" => Direction::Desc,
                        Some(d) => {
                            return Err(ApiError::bad_request(
                                format!("Invalid sort direction '{}'", d),
                                "pagination",
                                "invalidsort",
                            ))
                        }
                    };
                    let column = sortable
                        .iter()
                        .find(|(name, _)| *name == property)
                        .map(|(_, column)| *column)
                        .ok_or_else(|| {
                            ApiError::bad_request(
                                format!("Cannot sort by '{}'", property),
                                "pagination",
                                "invalidsort",
                            )
                        })?;
                    pageable.orders.push(Order { column, direction });
                }
                _ => {}
            }
        }

        Ok(pageable)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }

    /// Append `ORDER BY ... LIMIT ... OFFSET ...`. `id_column` is always the
    /// final tiebreaker so page boundaries are stable.
    pub fn push_order_and_limit(&self, qb: &mut QueryBuilder<'_, Sqlite>, id_column: &str) {
        qb.push(" ORDER BY ");
        for order in &self.orders {
            qb.push(order.column)
                .push(" ")
                .push(order.direction.as_sql())
                .push(", ");
        }
        qb.push(id_column).push(" ASC");
        qb.push(" LIMIT ")
            .push_bind(i64::from(self.size))
            .push(" OFFSET ")
            .push_bind(self.offset());
    }
}

/// One page of results plus the total number of matching elements
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: &Pageable, total: i64) -> Self {
        Self {
            content,
            page: pageable.page,
            size: pageable.size,
            total,
        }
    }

    pub fn total_pages(&self) -> u32 {
        if self.size == 0 || self.total <= 0 {
            return 0;
        }
        ((self.total as u64).div_ceil(u64::from(self.size))) as u32
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total: self.total,
        }
    }
}

/// `X-Total-Count` and `Link` headers for a page of a list endpoint
pub fn pagination_headers<T>(page: &Page<T>, base_url: &str) -> HeaderMap {
    build_headers(page, |p, s| {
        format!("{}?{}", base_url, encode(&[("page", p.to_string()), ("size", s.to_string())]))
    })
}

/// Same as [`pagination_headers`] but keeps the search query in every link
pub fn search_pagination_headers<T>(query: &str, page: &Page<T>, base_url: &str) -> HeaderMap {
    build_headers(page, |p, s| {
        format!(
            "{}?{}",
            base_url,
            encode(&[
                ("query", query.to_string()),
                ("page", p.to_string()),
                ("size", s.to_string()),
            ])
        )
    })
}

fn encode(pairs: &[(&str, String)]) -> String {
    serde_urlencoded::to_string(pairs).unwrap_or_default()
}

fn build_headers<T>(page: &Page<T>, uri: impl Fn(u32, u32) -> String) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&page.total.to_string()) {
        headers.insert("X-Total-Count", value);
    }

    let total_pages = page.total_pages();
    let mut links = Vec::new();
    if page.page + 1 < total_pages {
        links.push(format!("<{}>; rel=\"next\"", uri(page.page + 1, page.size)));
    }
    if page.page > 0 {
        links.push(format!("<{}>; rel=\"prev\"", uri(page.page - 1, page.size)));
    }
    let last_page = total_pages.saturating_sub(1);
    links.push(format!("<{}>; rel=\"last\"", uri(last_page, page.size)));
    links.push(format!("<{}>; rel=\"first\"", uri(0, page.size)));

    if let Ok(value) = HeaderValue::from_str(&links.join(",")) {
        headers.insert("Link", value);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    const SORTABLE: &[(&str, &str)] = &[("id", "t.id"), ("name", "t.name")];

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let pageable = Pageable::from_params(&[], SORTABLE).unwrap();
        assert_eq!(pageable.page, 0);
        assert_eq!(pageable.size, DEFAULT_PAGE_SIZE);
        assert!(pageable.orders.is_empty());
    }

    #[test]
    fn test_parse_page_size_and_sort() {
        let pageable = Pageable::from_params(
            &params(&[("page", "2"), ("size", "5"), ("sort", "name,desc"), ("sort", "id")]),
            SORTABLE,
        )
        .unwrap();

        assert_eq!(pageable.page, 2);
        assert_eq!(pageable.size, 5);
        assert_eq!(pageable.offset(), 10);
        assert_eq!(
            pageable.orders,
            vec![
                Order { column: "t.name", direction: Direction::Desc },
                Order { column: "t.id", direction: Direction::Asc },
            ]
        );
    }

    #[test]
    fn test_size_is_capped() {
        let pageable = Pageable::from_params(&params(&[("size", "5000")]), SORTABLE).unwrap();
        assert_eq!(pageable.size, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_unknown_sort_property_rejected() {
        let err = Pageable::from_params(&params(&[("sort", "password,asc")]), SORTABLE).unwrap_err();
        assert!(matches!(err, ApiError::BadRequestAlert { ref error_key, .. } if error_key == "invalidsort"));
    }

    #[test]
    fn test_invalid_page_rejected() {
        assert!(Pageable::from_params(&params(&[("page", "-1")]), SORTABLE).is_err());
    }

    #[test]
    fn test_total_pages() {
        let pageable = Pageable::of(0, 10);
        assert_eq!(Page::<i32>::new(vec![], &pageable, 0).total_pages(), 0);
        assert_eq!(Page::<i32>::new(vec![], &pageable, 10).total_pages(), 1);
        assert_eq!(Page::<i32>::new(vec![], &pageable, 11).total_pages(), 2);
    }

    #[test]
    fn test_headers_for_middle_page() {
        let page = Page::new(vec![1, 2], &Pageable::of(1, 2), 6);
        let headers = pagination_headers(&page, "/api/procedures");

        assert_eq!(headers.get("X-Total-Count").unwrap(), "6");
        let link = headers.get("Link").unwrap().to_str().unwrap();
        assert_eq!(
            link,
            "</api/procedures?page=2&size=2>; rel=\"next\",\
             </api/procedures?page=0&size=2>; rel=\"prev\",\
             </api/procedures?page=2&size=2>; rel=\"last\",\
             </api/procedures?page=0&size=2>; rel=\"first\""
        );
    }

    #[test]
    fn test_headers_for_empty_result() {
        let page: Page<i32> = Page::new(vec![], &Pageable::default(), 0);
        let headers = pagination_headers(&page, "/api/patients");
        let link = headers.get("Link").unwrap().to_str().unwrap();
        assert!(!link.contains("rel=\"next\""));
        assert!(!link.contains("rel=\"prev\""));
        assert!(link.contains("page=0&size=20>; rel=\"last\""));
    }

    #[test]
    fn test_search_headers_keep_query() {
        let page = Page::new(vec![1], &Pageable::of(0, 1), 2);
        let headers = search_pagination_headers("hip replacement", &page, "/api/_search/procedure-bookings");
        let link = headers.get("Link").unwrap().to_str().unwrap();
        assert!(link.starts_with(
            "</api/_search/procedure-bookings?query=hip+replacement&page=1&size=1>; rel=\"next\""
        ));
    }
}
