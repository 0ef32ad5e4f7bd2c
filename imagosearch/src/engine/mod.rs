//! Search engine boundary

mod elasticsearch;

pub use elasticsearch::ElasticsearchClient;

use async_trait::async_trait;
use serde_json::Value;

/// Failures talking to the search engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Engine returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid engine URL: {0}")]
    InvalidUrl(String),
}

/// A search engine holding media records
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Run a search body against the index and return the raw response
    async fn search(&self, body: &Value) -> Result<Value, EngineError>;

    /// Fetch a single document by id; `None` when it does not exist
    async fn get_document(&self, id: &str) -> Result<Option<Value>, EngineError>;

    /// Name of the index queried
    fn index(&self) -> &str;
}
