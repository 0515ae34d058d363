//! Page-number pagination envelope.

use axum::http::Uri;
use serde::{Deserialize, Serialize};

use prodreview_catalog::{PageRequest, PageSelector};

use crate::app::errors::ApiError;
use crate::config::PaginationSettings;

pub const PAGE_PARAM: &str = "page";
pub const PAGE_SIZE_PARAM: &str = "page_size";

/// Raw `page` / `page_size` query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl PageParams {
    /// Resolve against the settings. An unusable `page_size` falls back to the
    /// default; an unusable `page` is an error.
    pub fn to_request(&self, settings: PaginationSettings) -> Result<PageRequest, ApiError> {
        let page_size = self
            .page_size
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .map(|n| n.min(settings.max_page_size))
            .unwrap_or(settings.page_size);

        let page = match self.page.as_deref() {
            None => PageSelector::Number(1),
            Some(raw) => raw.parse::<PageSelector>().map_err(|_| ApiError::InvalidPage)?,
        };

        Ok(PageRequest { page, page_size })
    }
}

/// `{count, next, previous, results}` list response.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    /// Wrap one page of `results` for `page` (1-based) of `num_pages`.
    pub fn new(uri: &Uri, count: usize, page: usize, num_pages: usize, results: Vec<T>) -> Self {
        let next = (page < num_pages).then(|| page_link(uri, Some(page + 1)));
        let previous = (page > 1).then(|| page_link(uri, (page > 2).then_some(page - 1)));
        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

/// The request path and query with `page` replaced, or dropped when `page` is `None`.
fn page_link(uri: &Uri, page: Option<usize>) -> String {
    let mut pairs: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some(PAGE_PARAM))
        .map(str::to_string)
        .collect();
    if let Some(page) = page {
        pairs.push(format!("{PAGE_PARAM}={page}"));
    }
    pairs.sort_by(|a, b| a.split('=').next().cmp(&b.split('=').next()));

    if pairs.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), pairs.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> PaginationSettings {
        PaginationSettings {
            page_size: 10,
            max_page_size: 100,
        }
    }

    fn params(page: Option<&str>, page_size: Option<&str>) -> PageParams {
        PageParams {
            page: page.map(str::to_string),
            page_size: page_size.map(str::to_string),
        }
    }

    #[test]
    fn page_size_is_capped_and_falls_back_to_default() {
        assert_eq!(params(None, Some("5")).to_request(settings()).unwrap().page_size, 5);
        assert_eq!(params(None, Some("1000")).to_request(settings()).unwrap().page_size, 100);
        assert_eq!(params(None, Some("0")).to_request(settings()).unwrap().page_size, 10);
        assert_eq!(params(None, Some("lots")).to_request(settings()).unwrap().page_size, 10);
    }

    #[test]
    fn invalid_page_is_rejected() {
        assert!(matches!(
            params(Some("zero"), None).to_request(settings()),
            Err(ApiError::InvalidPage)
        ));
        assert_eq!(
            params(Some("last"), None).to_request(settings()).unwrap().page,
            PageSelector::Last
        );
    }

    #[test]
    fn links_keep_other_parameters() {
        let uri: Uri = "/api/reviews/?page_size=5&ordering=-rating&page=2".parse().unwrap();
        let page: Paginated<u8> = Paginated::new(&uri, 15, 2, 3, vec![]);

        assert_eq!(
            page.next.as_deref(),
            Some("/api/reviews/?ordering=-rating&page=3&page_size=5")
        );
        assert_eq!(page.previous.as_deref(), Some("/api/reviews/?ordering=-rating&page_size=5"));
    }

    #[test]
    fn single_page_has_no_links() {
        let uri: Uri = "/api/products/".parse().unwrap();
        let page: Paginated<u8> = Paginated::new(&uri, 3, 1, 1, vec![1, 2, 3]);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, None);
    }

    #[test]
    fn previous_from_third_page_keeps_page_number() {
        let uri: Uri = "/api/products/?page=3".parse().unwrap();
        let page: Paginated<u8> = Paginated::new(&uri, 30, 3, 3, vec![]);
        assert_eq!(page.previous.as_deref(), Some("/api/products/?page=2"));
        assert_eq!(page.next, None);
    }
}
