use thiserror::Error;

use crate::catalog::CatalogError;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    #[error("Request to {0} timed out")]
    Timeout(String),
}

/// Errors surfaced by a barcode scan.
///
/// Only the catalog lookup can fail a scan; everything after it degrades to
/// partial results.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("No product found for barcode {0}")]
    NotFound(String),

    #[error("Product lookup failed: {0}")]
    Catalog(#[source] CatalogError),
}

impl From<CatalogError> for ScanError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound { barcode } => ScanError::NotFound(barcode),
            other => ScanError::Catalog(other),
        }
    }
}
