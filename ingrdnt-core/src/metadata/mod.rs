//! Per-ingredient metadata: external lookups and their in-process cache.

mod cache;
mod fetcher;

pub use cache::{CacheStats, MetadataCache};
pub use fetcher::{parse_metadata, MetadataFetcher, OpenFoodFactsFetcher};
