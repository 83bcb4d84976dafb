//! Product catalog lookup by barcode.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;

use crate::error::FetchError;
use crate::http::{product_url, HttpClient};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("No product found for barcode {barcode}")]
    NotFound { barcode: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// A product as returned by the catalog. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductRecord {
    pub code: Option<String>,
    /// Catalog-internal identifier, used when `code` is missing.
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub product_name: Option<String>,
    pub image_url: Option<String>,
    pub image_front_url: Option<String>,
    pub ingredients_text: Option<String>,
    pub ingredients_text_en: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub categories_tags: Vec<String>,
    pub nutriscore_grade: Option<String>,
}

impl ProductRecord {
    /// Ingredient text to analyze, English label first.
    pub fn ingredients(&self) -> Option<&str> {
        non_empty(&self.ingredients_text_en).or_else(|| non_empty(&self.ingredients_text))
    }

    /// Primary category, or "" when the product has none.
    pub fn category(&self) -> &str {
        self.categories_tags.first().map(String::as_str).unwrap_or("")
    }

    pub fn name(&self) -> &str {
        self.product_name.as_deref().unwrap_or("")
    }

    pub fn image(&self) -> Option<&str> {
        non_empty(&self.image_front_url).or_else(|| non_empty(&self.image_url))
    }

    /// Barcode, falling back to the internal identifier.
    pub fn code_or_id(&self) -> Option<&str> {
        non_empty(&self.code).or_else(|| non_empty(&self.id))
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn lookup(&self, barcode: &str) -> Result<ProductRecord, CatalogError>;
}

pub struct OpenFoodFactsCatalog {
    client: Arc<dyn HttpClient>,
    base_url: String,
}

impl OpenFoodFactsCatalog {
    pub fn new(client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ProductCatalog for OpenFoodFactsCatalog {
    async fn lookup(&self, barcode: &str) -> Result<ProductRecord, CatalogError> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            return Err(CatalogError::NotFound {
                barcode: String::new(),
            });
        }

        let url = product_url(&self.base_url, barcode)?;
        let json = self.client.fetch_json(&url).await?;
        let product = parse_product_response(&json)?.ok_or_else(|| CatalogError::NotFound {
            barcode: barcode.to_string(),
        })?;

        tracing::debug!(barcode, name = product.name(), "product found");
        Ok(product)
    }
}

/// Extract the product from a lookup response.
///
/// `Ok(None)` means "not found": `status == 0`, no product object, or a
/// product without a name. A product body of the wrong shape is an error.
pub fn parse_product_response(json: &JsonValue) -> Result<Option<ProductRecord>, FetchError> {
    if json.get("status").and_then(JsonValue::as_i64) == Some(0) {
        return Ok(None);
    }

    let body = match json.get("product") {
        None | Some(JsonValue::Null) => return Ok(None),
        Some(body) => body,
    };
    let product: ProductRecord = serde_json::from_value(body.clone())
        .map_err(|e| FetchError::InvalidJson(format!("product body: {e}")))?;
    if product.name().trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(product))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockClient;
    use serde_json::json;

    const BASE: &str = "https://off.test";

    #[test]
    fn test_product_accessors() {
        let product = ProductRecord {
            id: Some("internal-1".to_string()),
            image_url: Some("https://img/1.jpg".to_string()),
            image_front_url: Some(String::new()),
            ingredients_text: Some("sugar".to_string()),
            ingredients_text_en: Some("Sugar, salt".to_string()),
            categories_tags: vec!["en:snacks".to_string(), "en:sweets".to_string()],
            ..Default::default()
        };
        assert_eq!(product.ingredients(), Some("Sugar, salt"));
        assert_eq!(product.category(), "en:snacks");
        assert_eq!(product.image(), Some("https://img/1.jpg"));
        assert_eq!(product.code_or_id(), Some("internal-1"));
        assert_eq!(ProductRecord::default().category(), "");
    }

    #[test]
    fn test_parse_not_found_variants() {
        let not_found = [
            json!({"status": 0, "product": {"product_name": "X"}}),
            json!({"status": 1}),
            json!({"status": 1, "product": null}),
            json!({"status": 1, "product": {"code": "1"}}),
            json!({"status": 1, "product": {"product_name": " "}}),
        ];
        for body in not_found {
            assert!(parse_product_response(&body).unwrap().is_none(), "{body}");
        }
    }

    #[test]
    fn test_parse_malformed_product_is_an_error() {
        let body = json!({
            "status": 1,
            "product": {"product_name": "Cola", "categories_tags": ["en:sodas", 7]}
        });
        assert!(matches!(
            parse_product_response(&body),
            Err(FetchError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_parse_ignores_unknown_fields() {
        let product = parse_product_response(&json!({
            "status": 1,
            "product": {
                "code": "3017620422003",
                "product_name": "Nutella",
                "nova_group": 4,
                "categories_tags": ["en:spreads"]
            }
        }))
        .unwrap()
        .unwrap();
        assert_eq!(product.code.as_deref(), Some("3017620422003"));
        assert_eq!(product.category(), "en:spreads");

        let product = parse_product_response(&json!({
            "status": 1,
            "product": {
                "code": "1",
                "product_name": "Water",
                "categories_tags": null
            }
        }))
        .unwrap()
        .unwrap();
        assert!(product.categories_tags.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_found() {
        let client = MockClient::new().with_json(
            "https://off.test/api/v2/product/123",
            json!({"status": 1, "product": {"code": "123", "product_name": "Cola"}}),
        );
        let catalog = OpenFoodFactsCatalog::new(Arc::new(client), BASE);
        let product = catalog.lookup("123").await.unwrap();
        assert_eq!(product.name(), "Cola");
    }

    #[tokio::test]
    async fn test_lookup_not_found_is_distinct_from_transport_error() {
        let client = MockClient::new()
            .with_json("https://off.test/api/v2/product/404", json!({"status": 0}))
            .with_error("https://off.test/api/v2/product/500", "connection refused")
            .with_json(
                "https://off.test/api/v2/product/777",
                json!({"status": 1, "product": {"product_name": "Cola", "categories_tags": [{}]}}),
            );
        let catalog = OpenFoodFactsCatalog::new(Arc::new(client), BASE);

        assert!(matches!(
            catalog.lookup("404").await,
            Err(CatalogError::NotFound { barcode }) if barcode == "404"
        ));
        assert!(matches!(
            catalog.lookup("500").await,
            Err(CatalogError::Fetch(_))
        ));
        assert!(matches!(
            catalog.lookup("777").await,
            Err(CatalogError::Fetch(FetchError::InvalidJson(_)))
        ));
    }
}
