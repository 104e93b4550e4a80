//! Error types for the cache, the remote source and the load path.

use thiserror::Error;

/// Failure of the on-disk dataset cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt cache entry: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure fetching or decoding a dataset from the remote source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    Parse(#[from] simd_json::Error),

    /// Used by sources that are not backed by HTTP (offline mode, tests).
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Anything that can go wrong while loading or refreshing datasets.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
