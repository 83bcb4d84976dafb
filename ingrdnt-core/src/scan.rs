//! Scan entry points: product in, [`ScanResult`] out.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info_span, Instrument};

use crate::alternatives::AlternativesResolver;
use crate::analyzer::IngredientAnalyzer;
use crate::catalog::{OpenFoodFactsCatalog, ProductCatalog, ProductRecord};
use crate::config::{ConfigError, ScanConfig, DEFAULT_HTTP_TIMEOUT_MS};
use crate::error::ScanError;
use crate::history::{JsonlScanHistory, ScanHistory, ScanRecord};
use crate::http::{ApiClientBuilder, HttpClient};
use crate::metadata::{MetadataCache, OpenFoodFactsFetcher};
use crate::types::ScanResult;

/// Drives analysis and alternatives for one product, then records the scan.
pub struct ScanResultAggregator {
    analyzer: IngredientAnalyzer,
    alternatives: AlternativesResolver,
    history: Arc<dyn ScanHistory>,
    history_timeout: Duration,
}

impl ScanResultAggregator {
    pub fn new(
        analyzer: IngredientAnalyzer,
        alternatives: AlternativesResolver,
        history: Arc<dyn ScanHistory>,
    ) -> Self {
        Self {
            analyzer,
            alternatives,
            history,
            history_timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
        }
    }

    /// Bound how long a history write may hold back the result.
    pub fn with_history_timeout(mut self, timeout: Duration) -> Self {
        self.history_timeout = timeout;
        self
    }

    pub fn analyzer(&self) -> &IngredientAnalyzer {
        &self.analyzer
    }

    pub fn alternatives(&self) -> &AlternativesResolver {
        &self.alternatives
    }

    pub fn history(&self) -> &dyn ScanHistory {
        self.history.as_ref()
    }

    /// Analyze ingredients and resolve alternatives concurrently.
    ///
    /// Never fails: lookup problems degrade inside the analyzer and resolver,
    /// and a failed or stalled history write is logged and otherwise ignored.
    pub async fn aggregate(&self, product: ProductRecord) -> ScanResult {
        let name = product.name().to_string();

        let (flagged, alternatives) = tokio::join!(
            self.analyzer
                .analyze(product.ingredients())
                .instrument(info_span!("analyze_ingredients", product = %name)),
            self.alternatives
                .resolve(&name, product.category())
                .instrument(info_span!("resolve_alternatives", product = %name)),
        );

        self.record_history(&product)
            .instrument(info_span!("record_history", product = %name))
            .await;

        ScanResult {
            product,
            flagged,
            alternatives,
        }
    }

    async fn record_history(&self, product: &ProductRecord) {
        let record = match ScanRecord::from_product(product, Utc::now()) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "not recording scan");
                return;
            }
        };

        match tokio::time::timeout(self.history_timeout, self.history.record(&record)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(code = %record.code, error = %e, "failed to record scan history")
            }
            Err(_) => tracing::warn!(
                code = %record.code,
                timeout_ms = self.history_timeout.as_millis() as u64,
                "scan history write timed out"
            ),
        }
    }
}

/// Barcode-to-result flow: catalog lookup followed by aggregation.
pub struct Scanner {
    catalog: Arc<dyn ProductCatalog>,
    aggregator: ScanResultAggregator,
}

impl Scanner {
    pub fn new(catalog: Arc<dyn ProductCatalog>, aggregator: ScanResultAggregator) -> Self {
        Self {
            catalog,
            aggregator,
        }
    }

    /// Wire every collaborator to one HTTP client built from `config`, with
    /// history written to `config.history_path`.
    pub fn from_config(config: &ScanConfig) -> Result<Self, ConfigError> {
        let history = Arc::new(JsonlScanHistory::new(config.history_path.clone()));
        Self::from_config_with_history(config, history)
    }

    pub fn from_config_with_history(
        config: &ScanConfig,
        history: Arc<dyn ScanHistory>,
    ) -> Result<Self, ConfigError> {
        let client = ApiClientBuilder::from_config(config).build()?;
        Self::with_client(config, Arc::new(client), history)
    }

    /// Build from an arbitrary HTTP client, e.g. a mock.
    pub fn with_client(
        config: &ScanConfig,
        client: Arc<dyn HttpClient>,
        history: Arc<dyn ScanHistory>,
    ) -> Result<Self, ConfigError> {
        let rules = Arc::new(config.load_rules()?);
        let fetcher = Arc::new(OpenFoodFactsFetcher::new(
            Arc::clone(&client),
            config.api_base_url.clone(),
            config.http_timeout,
        ));
        let analyzer = IngredientAnalyzer::new(rules, MetadataCache::from_config(config), fetcher)
            .with_fetch_concurrency(config.fetch_concurrency);
        let alternatives = AlternativesResolver::new(
            Arc::clone(&client),
            config.api_base_url.clone(),
            config.http_timeout,
        )
        .with_limit(config.max_alternatives);
        let catalog = Arc::new(OpenFoodFactsCatalog::new(client, config.api_base_url.clone()));

        let aggregator = ScanResultAggregator::new(analyzer, alternatives, history)
            .with_history_timeout(config.http_timeout);
        Ok(Self::new(catalog, aggregator))
    }

    pub fn aggregator(&self) -> &ScanResultAggregator {
        &self.aggregator
    }

    /// Look up `barcode` and scan the product.
    ///
    /// A product the catalog does not know is reported as
    /// [`ScanError::NotFound`] before any analysis runs.
    pub async fn scan_barcode(&self, barcode: &str) -> Result<ScanResult, ScanError> {
        let product = self
            .catalog
            .lookup(barcode)
            .instrument(info_span!("catalog_lookup", barcode))
            .await?;
        Ok(self.aggregator.aggregate(product).await)
    }
}
