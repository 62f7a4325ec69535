//! Cachet error types

/// Boxed error returned by wrapped computations and custom identifiers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Cachet error types
#[derive(Debug, thiserror::Error)]
pub enum CachetError {
    // Call errors
    /// The identifier could not produce an identity token for the instance.
    /// Key construction cannot proceed; no fallback identity is used.
    #[error("identifier failed: {0}")]
    Identifier(#[source] BoxError),

    /// The wrapped computation failed. Nothing was cached.
    #[error("computation failed: {0}")]
    Compute(#[source] BoxError),

    // Store errors
    /// The cache store could not serve the request ("cache unavailable").
    #[error("cache store '{store}' unavailable: {message}")]
    Store { store: String, message: String },

    // Data errors
    #[error("cached value under '{key}' could not be decoded: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CachetError {
    /// Build a store failure for the named store.
    pub fn store(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            store: store.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from the cache store rather than the
    /// computation, the identifier, or the data.
    pub fn is_cache_unavailable(&self) -> bool {
        matches!(self, Self::Store { .. })
    }
}

/// Result type alias for Cachet operations
pub type Result<T> = std::result::Result<T, CachetError>;
