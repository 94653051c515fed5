use thiserror::Error;

/// Faults the cache core can run into.
///
/// None of these reach the UI: the store and reconciler log them and fall
/// back to an empty or absent result. A lookup that finds nothing is an
/// `Option::None`, not an error.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("storage fault: {0:#}")]
    Storage(#[from] anyhow::Error),
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
    #[error("gateway fault: {0}")]
    Gateway(String),
}

impl CacheError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        CacheError::MalformedSnapshot(msg.into())
    }

    pub fn gateway(err: impl std::fmt::Display) -> Self {
        CacheError::Gateway(err.to_string())
    }
}
