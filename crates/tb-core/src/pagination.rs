//! Pagination and sorting types for API collections

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Offset-based pagination parameters (from query string)
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    #[serde(default)]
    pub offset: i64,

    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            offset: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationParams {
    pub fn new(offset: i64, page_size: i64) -> Self {
        Self { offset, page_size }.normalized()
    }

    /// Clamp offset and page size into their accepted ranges
    pub fn normalized(self) -> Self {
        Self {
            offset: self.offset.max(0),
            page_size: self.page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

/// Paginated collection response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    #[serde(rename = "_type")]
    pub type_name: String,

    /// Total count of items matching the query
    pub total: i64,

    /// Number of items in this page
    pub count: i64,

    pub page_size: i64,

    pub offset: i64,

    #[serde(rename = "_links")]
    pub links: PaginationLinks,

    #[serde(rename = "_embedded")]
    pub embedded: PaginatedEmbedded<T>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationLinks {
    #[serde(rename = "self")]
    pub self_link: LinkObject,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "previousByOffset")]
    pub previous: Option<LinkObject>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "nextByOffset")]
    pub next: Option<LinkObject>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkObject {
    pub href: String,
}

impl LinkObject {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginatedEmbedded<T> {
    pub elements: Vec<T>,
}

impl<T> PaginatedResponse<T> {
    /// Build a collection page. `base_url` may already carry a query string.
    pub fn new(items: Vec<T>, total: i64, params: &PaginationParams, base_url: &str) -> Self {
        let offset = params.offset();
        let count = items.len() as i64;
        let page_size = params.page_size;
        let separator = if base_url.contains('?') { '&' } else { '?' };
        let href = |offset: i64| {
            format!(
                "{}{}offset={}&pageSize={}",
                base_url, separator, offset, page_size
            )
        };

        let previous = (offset > 0).then(|| LinkObject::new(href((offset - page_size).max(0))));
        let next = (offset + count < total).then(|| LinkObject::new(href(offset + page_size)));

        Self {
            type_name: "Collection".to_string(),
            total,
            count,
            page_size,
            offset,
            links: PaginationLinks {
                self_link: LinkObject::new(href(offset)),
                previous,
                next,
            },
            embedded: PaginatedEmbedded { elements: items },
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResponse<U> {
        PaginatedResponse {
            type_name: self.type_name,
            total: self.total,
            count: self.count,
            page_size: self.page_size,
            offset: self.offset,
            links: self.links,
            embedded: PaginatedEmbedded {
                elements: self.embedded.elements.into_iter().map(f).collect(),
            },
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One `field:direction` entry from a sort parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortParam {
    pub field: String,
    pub direction: SortDirection,
}

impl SortParam {
    /// Parse `"dueDate:asc,createdAt:desc"`; a bare field sorts ascending.
    ///
    /// Unknown direction suffixes are kept as part of the field name so the
    /// caller's field validation rejects them.
    pub fn parse(sort_string: &str) -> Vec<Self> {
        sort_string
            .split(',')
            .filter_map(|part| {
                let part = part.trim();
                if part.is_empty() {
                    return None;
                }

                let (field, direction) = if let Some(field) = part.strip_suffix(":desc") {
                    (field, SortDirection::Desc)
                } else if let Some(field) = part.strip_suffix(":asc") {
                    (field, SortDirection::Asc)
                } else {
                    (part, SortDirection::Asc)
                };

                Some(SortParam {
                    field: field.trim().to_string(),
                    direction,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_pagination() {
        let params = PaginationParams::new(-5, 1000);
        assert_eq!(params.offset(), 0);
        assert_eq!(params.limit(), MAX_PAGE_SIZE);

        let params = PaginationParams::new(40, 0);
        assert_eq!(params.limit(), 1);
    }

    #[test]
    fn test_paginated_response_links() {
        let params = PaginationParams::new(20, 20);
        let page = PaginatedResponse::new(vec![1; 20], 65, &params, "/api/v1/tasks");

        assert_eq!(page.count, 20);
        assert_eq!(page.links.self_link.href, "/api/v1/tasks?offset=20&pageSize=20");
        assert_eq!(
            page.links.previous.as_ref().map(|l| l.href.as_str()),
            Some("/api/v1/tasks?offset=0&pageSize=20")
        );
        assert_eq!(
            page.links.next.as_ref().map(|l| l.href.as_str()),
            Some("/api/v1/tasks?offset=40&pageSize=20")
        );
    }

    #[test]
    fn test_paginated_response_last_page() {
        let params = PaginationParams::new(0, 20);
        let page = PaginatedResponse::new(vec!["a", "b"], 2, &params, "/api/v1/tasks?status=todo");

        assert!(page.links.previous.is_none());
        assert!(page.links.next.is_none());
        assert_eq!(
            page.links.self_link.href,
            "/api/v1/tasks?status=todo&offset=0&pageSize=20"
        );

        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["_type"], "Collection");
        assert_eq!(json["pageSize"], 20);
        assert_eq!(json["_embedded"]["elements"][1], "b");
    }

    #[test]
    fn test_sort_param_parse() {
        let sorts = SortParam::parse("dueDate:asc, createdAt:desc,title,,");
        assert_eq!(sorts.len(), 3);
        assert_eq!(sorts[0].field, "dueDate");
        assert_eq!(sorts[0].direction, SortDirection::Asc);
        assert_eq!(sorts[1].direction, SortDirection::Desc);
        assert_eq!(sorts[2].field, "title");
        assert_eq!(sorts[2].direction, SortDirection::Asc);
    }
}
