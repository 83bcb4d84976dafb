//! Ingredient analysis: normalize, classify, enrich.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::DEFAULT_FETCH_CONCURRENCY;
use crate::metadata::{MetadataCache, MetadataFetcher};
use crate::normalizer::normalize;
use crate::rules::RuleSet;
use crate::types::{IngredientMetadata, IngredientRecord};

/// Turns raw ingredient text into one [`IngredientRecord`] per distinct token.
///
/// Metadata for all tokens is resolved in parallel, at most
/// `fetch_concurrency` lookups at a time, through the shared cache.
pub struct IngredientAnalyzer {
    rules: Arc<RuleSet>,
    cache: MetadataCache,
    fetcher: Arc<dyn MetadataFetcher>,
    fetch_concurrency: usize,
}

impl IngredientAnalyzer {
    pub fn new(rules: Arc<RuleSet>, cache: MetadataCache, fetcher: Arc<dyn MetadataFetcher>) -> Self {
        Self {
            rules,
            cache,
            fetcher,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }

    /// Set the maximum number of in-flight metadata lookups. Clamped to at least 1.
    pub fn with_fetch_concurrency(mut self, limit: usize) -> Self {
        self.fetch_concurrency = limit.max(1);
        self
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Analyze raw label text. Absent or empty text yields an empty list.
    ///
    /// Every token gets a record: a token whose metadata could not be resolved
    /// keeps its rule verdict with default metadata.
    pub async fn analyze(&self, raw: Option<&str>) -> Vec<IngredientRecord> {
        let tokens = normalize(raw);
        if tokens.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.fetch_concurrency));
        let mut tasks = JoinSet::new();

        for (index, token) in tokens.iter().enumerate() {
            let token = token.as_str().to_string();
            let cache = self.cache.clone();
            let fetcher = Arc::clone(&self.fetcher);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let metadata = match semaphore.acquire_owned().await {
                    Ok(_permit) => cache.get_or_fetch(&token, fetcher.as_ref()).await,
                    Err(_) => IngredientMetadata::default(),
                };
                (index, metadata)
            });
        }

        let mut resolved: Vec<Option<IngredientMetadata>> = vec![None; tokens.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, metadata)) => resolved[index] = Some(metadata),
                Err(e) => tracing::warn!(error = %e, "metadata task failed, using rule verdict only"),
            }
        }

        tokens
            .into_iter()
            .zip(resolved)
            .map(|(token, metadata)| {
                let verdict = self.rules.classify(token.as_str());
                IngredientRecord::merge(token, verdict, metadata.unwrap_or_default())
            })
            .collect()
    }
}
