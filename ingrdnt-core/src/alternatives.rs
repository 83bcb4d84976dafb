//! Popular products from the same category, offered as alternatives.

use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::config::MAX_ALTERNATIVES;
use crate::error::FetchError;
use crate::http::{search_url, HttpClient};
use crate::types::AlternativeSuggestion;

pub struct AlternativesResolver {
    client: Arc<dyn HttpClient>,
    base_url: String,
    timeout: Duration,
    limit: usize,
}

impl AlternativesResolver {
    pub fn new(client: Arc<dyn HttpClient>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
            limit: MAX_ALTERNATIVES,
        }
    }

    /// Lower the cap on returned alternatives. Never exceeds five.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.min(MAX_ALTERNATIVES);
        self
    }

    /// Up to five distinct product names for `category`, most scanned first.
    ///
    /// `product_name` is only used for logging. An empty category returns
    /// immediately without a request; any request or parse failure yields an
    /// empty list.
    pub async fn resolve(&self, product_name: &str, category: &str) -> Vec<AlternativeSuggestion> {
        let category = category.trim();
        if category.is_empty() {
            tracing::debug!(product = product_name, "no category, skipping alternatives");
            return Vec::new();
        }

        match self.search(category).await {
            Ok(json) => {
                let alternatives = extract_alternatives(&json, self.limit);
                tracing::debug!(
                    product = product_name,
                    category,
                    count = alternatives.len(),
                    "alternatives resolved"
                );
                alternatives
            }
            Err(e) => {
                tracing::warn!(product = product_name, category, error = %e, "alternatives lookup failed");
                Vec::new()
            }
        }
    }

    async fn search(&self, category: &str) -> Result<JsonValue, FetchError> {
        let url = search_url(&self.base_url, category)?;
        tokio::time::timeout(self.timeout, self.client.fetch_json(&url))
            .await
            .map_err(|_| FetchError::Timeout(url.clone()))?
    }
}

/// Pull product names out of a search response, keeping service order.
///
/// Null, non-string and blank names are skipped; duplicates (exact equality)
/// keep their first position.
pub fn extract_alternatives(json: &JsonValue, limit: usize) -> Vec<AlternativeSuggestion> {
    let Some(products) = json.get("products").and_then(JsonValue::as_array) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    products
        .iter()
        .filter_map(|p| p.get("product_name").and_then(JsonValue::as_str))
        .filter(|name| !name.trim().is_empty())
        .filter(|name| seen.insert(*name))
        .take(limit)
        .map(AlternativeSuggestion::new)
        .collect()
}
