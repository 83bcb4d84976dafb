//! HTTP access to the product catalog service.
//!
//! All outgoing requests go through an [`HttpClient`] so the pipeline can be
//! exercised against [`MockClient`] in tests.

mod client;
mod rate_limiter;

pub use client::{ApiClient, ApiClientBuilder, HttpClient, MockClient, MockResponse};
pub use rate_limiter::RateLimiter;

use url::Url;

use crate::error::FetchError;

/// Page size requested from the search endpoint.
pub const SEARCH_PAGE_SIZE: usize = 5;

fn parse_base(base_url: &str) -> Result<Url, FetchError> {
    let url = Url::parse(base_url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(FetchError::InvalidUrl(base_url.to_string()));
    }
    Ok(url)
}

fn push_segments(base_url: &str, segments: &[&str]) -> Result<String, FetchError> {
    let mut url = parse_base(base_url)?;
    url.path_segments_mut()
        .map_err(|_| FetchError::InvalidUrl(base_url.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}

/// Ingredient metadata endpoint: `<base>/ingredient/<token>.json`.
///
/// The token is percent-encoded as one path segment, so spaces become `%20`
/// and slashes cannot escape the segment.
pub fn ingredient_url(base_url: &str, token: &str) -> Result<String, FetchError> {
    push_segments(base_url, &["ingredient", &format!("{}.json", token)])
}

/// Product lookup endpoint: `<base>/api/v2/product/<barcode>`.
pub fn product_url(base_url: &str, barcode: &str) -> Result<String, FetchError> {
    push_segments(base_url, &["api", "v2", "product", barcode])
}

/// Popularity-ranked category search.
pub fn search_url(base_url: &str, category: &str) -> Result<String, FetchError> {
    let mut url = Url::parse(&push_segments(base_url, &["api", "v2", "search"])?)
        .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
    url.query_pairs_mut()
        .append_pair("categories_tags", category)
        .append_pair("sort_by", "unique_scans_n")
        .append_pair("page_size", &SEARCH_PAGE_SIZE.to_string());
    Ok(url.into())
}
