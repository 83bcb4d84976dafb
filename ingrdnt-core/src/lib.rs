pub mod alternatives;
pub mod analyzer;
pub mod catalog;
pub mod config;
pub mod error;
pub mod history;
pub mod http;
pub mod metadata;
pub mod normalizer;
pub mod rules;
pub mod scan;
pub mod types;

pub use alternatives::AlternativesResolver;
pub use analyzer::IngredientAnalyzer;
pub use catalog::{CatalogError, OpenFoodFactsCatalog, ProductCatalog, ProductRecord};
pub use config::{ConfigError, ScanConfig};
pub use error::{FetchError, ScanError};
pub use history::{
    HistoryError, JsonlScanHistory, MemoryScanHistory, ScanHistory, ScanRecord,
};
pub use http::{ApiClient, ApiClientBuilder, HttpClient, MockClient, MockResponse};
pub use metadata::{CacheStats, MetadataCache, MetadataFetcher, OpenFoodFactsFetcher};
pub use normalizer::normalize;
pub use rules::{Classification, Rule, RuleSet, RulesError, Verdict};
pub use scan::{ScanResultAggregator, Scanner};
pub use types::{
    AlternativeSuggestion, DietaryStatus, IngredientMetadata, IngredientRecord, IngredientToken,
    ScanResult,
};
