//! Media search API over an Elasticsearch index of image metadata
//!
//! This crate translates untyped, paginated and filterable search requests
//! into Elasticsearch Query DSL, runs them through a [`SearchEngine`], and maps
//! the raw engine payload back into a stable external schema.
//!
//! # Endpoints
//!
//! - `GET /api/search` - Filtered, paginated media search with facets
//! - `GET /api/aggregations` - Corpus-wide facet counts for filter options
//! - `GET /api/media/:id` - Single media record
//! - `GET /health` - Liveness
//! - `GET /metrics` - Prometheus metrics (when enabled)
//!
//! # Pipeline
//!
//! ```text
//! query string -> SearchRequest -> CompiledQuery -> engine -> SearchResponse
//! ```

pub mod aggregations;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod query;
pub mod request;
pub mod response;
pub mod service;

pub use engine::{ElasticsearchClient, EngineError, SearchEngine};
pub use error::Error;
pub use request::{SearchRequest, SortOrder, ValidationErrors};
pub use response::{SearchResponse, ShapeError};
pub use service::SearchService;

/// Result type for search operations
pub type Result<T> = std::result::Result<T, Error>;
