//! Ingredient metadata lookups against the catalog service.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;
use crate::http::{ingredient_url, HttpClient};
use crate::types::{DietaryStatus, IngredientMetadata};

/// Source of per-ingredient metadata.
///
/// Implementations never fail: any lookup problem yields
/// `IngredientMetadata::default()` so classification can carry on with the
/// rule verdict alone.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, token: &str) -> IngredientMetadata;
}

/// Fetches `/ingredient/<token>.json` from Open Food Facts.
pub struct OpenFoodFactsFetcher {
    client: Arc<dyn HttpClient>,
    base_url: String,
    timeout: Duration,
}

impl OpenFoodFactsFetcher {
    pub fn new(client: Arc<dyn HttpClient>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    async fn try_fetch(&self, token: &str) -> Result<IngredientMetadata, FetchError> {
        let url = ingredient_url(&self.base_url, token)?;
        let json = tokio::time::timeout(self.timeout, self.client.fetch_json(&url))
            .await
            .map_err(|_| FetchError::Timeout(url.clone()))??;
        parse_metadata(&json)
    }
}

#[async_trait]
impl MetadataFetcher for OpenFoodFactsFetcher {
    async fn fetch(&self, token: &str) -> IngredientMetadata {
        match self.try_fetch(token).await {
            Ok(metadata) => {
                tracing::debug!(token, nova = ?metadata.nova, "ingredient metadata fetched");
                metadata
            }
            Err(e) => {
                tracing::warn!(token, error = %e, "ingredient metadata lookup failed, using defaults");
                IngredientMetadata::default()
            }
        }
    }
}

/// Map a metadata response into [`IngredientMetadata`].
///
/// Absent fields take their defaults. A body that is not a JSON object is a
/// malformed response.
pub fn parse_metadata(json: &JsonValue) -> Result<IngredientMetadata, FetchError> {
    let object = json
        .as_object()
        .ok_or_else(|| FetchError::InvalidJson("expected a JSON object".to_string()))?;

    Ok(IngredientMetadata {
        nova: object.get("nova_group").and_then(parse_nova),
        vegan: DietaryStatus::from_service(object.get("vegan").and_then(JsonValue::as_str)),
        vegetarian: DietaryStatus::from_service(
            object.get("vegetarian").and_then(JsonValue::as_str),
        ),
        additives: string_set(object.get("additives_tags")),
        allergens: string_set(object.get("allergens_tags")),
    })
}

/// NOVA groups are 1 through 4; the service sends them as numbers or strings.
fn parse_nova(value: &JsonValue) -> Option<u8> {
    let group = match value {
        JsonValue::Number(n) => n.as_u64()?,
        JsonValue::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (1..=4).contains(&group).then_some(group as u8)
}

fn string_set(value: Option<&JsonValue>) -> BTreeSet<String> {
    value
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(JsonValue::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockClient, MockResponse};
    use serde_json::json;

    const BASE: &str = "https://off.test";

    fn fetcher(client: MockClient) -> OpenFoodFactsFetcher {
        OpenFoodFactsFetcher::new(Arc::new(client), BASE, Duration::from_millis(200))
    }

    #[test]
    fn test_parse_full_response() {
        let metadata = parse_metadata(&json!({
            "nova_group": 4,
            "vegan": "no",
            "vegetarian": "yes",
            "additives_tags": ["en:e951", "en:e330", "en:e951"],
            "allergens_tags": ["en:milk"]
        }))
        .unwrap();
        assert_eq!(metadata.nova, Some(4));
        assert_eq!(metadata.vegan, DietaryStatus::No);
        assert_eq!(metadata.vegetarian, DietaryStatus::Yes);
        assert_eq!(metadata.additives.len(), 2);
        assert!(metadata.allergens.contains("en:milk"));
    }

    #[test]
    fn test_parse_defaults() {
        let metadata = parse_metadata(&json!({})).unwrap();
        assert_eq!(metadata, IngredientMetadata::default());
    }

    #[test]
    fn test_parse_nova_variants() {
        assert_eq!(parse_nova(&json!("3")), Some(3));
        assert_eq!(parse_nova(&json!(7)), None);
        assert_eq!(parse_nova(&json!(null)), None);
        assert_eq!(parse_nova(&json!(-1)), None);
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(parse_metadata(&json!([1, 2])).is_err());
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let client = MockClient::new().with_json(
            "https://off.test/ingredient/sodium%20benzoate.json",
            json!({"nova_group": 4, "additives_tags": ["en:e211"]}),
        );
        let metadata = fetcher(client).fetch("sodium benzoate").await;
        assert_eq!(metadata.nova, Some(4));
        assert!(metadata.additives.contains("en:e211"));
        assert_eq!(metadata.vegan, DietaryStatus::Unknown);
    }

    #[tokio::test]
    async fn test_fetch_failures_degrade_to_empty() {
        let client = MockClient::new()
            .with_status("https://off.test/ingredient/water.json", 404)
            .with_bytes("https://off.test/ingredient/salt.json", b"not json".to_vec())
            .with_error("https://off.test/ingredient/sugar.json", "connection reset");
        let fetcher = fetcher(client);
        for token in ["water", "salt", "sugar", "unregistered"] {
            assert!(fetcher.fetch(token).await.is_empty(), "{token} should be empty");
        }
    }

    #[tokio::test]
    async fn test_fetch_timeout_degrades_to_empty() {
        let client = MockClient::new().with_response(
            "https://off.test/ingredient/water.json",
            MockResponse::Delayed(
                Duration::from_secs(5),
                Box::new(MockResponse::Json(json!({"nova_group": 1}))),
            ),
        );
        let fetcher = OpenFoodFactsFetcher::new(Arc::new(client), BASE, Duration::from_millis(20));
        let start = std::time::Instant::now();
        assert!(fetcher.fetch("water").await.is_empty());
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
