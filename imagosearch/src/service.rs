//! Request-scoped search operations over a shared engine handle

use crate::aggregations::{AggregationFetcher, GlobalAggregations};
use crate::config::Config;
use crate::engine::{EngineError, SearchEngine};
use crate::error::Error;
use crate::metrics::record_engine_error;
use crate::query::QueryCompiler;
use crate::request::SearchRequest;
use crate::response::{MediaHit, ResponseMapper, SearchResponse};
use crate::Result;
use std::sync::Arc;

/// Compiles, executes and maps search requests
///
/// Holds no per-request state; one instance serves every request.
#[derive(Clone)]
pub struct SearchService {
    engine: Arc<dyn SearchEngine>,
    compiler: QueryCompiler,
    mapper: ResponseMapper,
    fetcher: AggregationFetcher,
}

impl SearchService {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        compiler: QueryCompiler,
        mapper: ResponseMapper,
        fetcher: AggregationFetcher,
    ) -> Self {
        Self {
            engine,
            compiler,
            mapper,
            fetcher,
        }
    }

    /// Wire up compiler, mapper and fetcher from configuration
    pub fn from_config(engine: Arc<dyn SearchEngine>, config: &Config) -> Self {
        Self::new(
            engine,
            QueryCompiler::new(config.search.clone()),
            ResponseMapper::new(config.media.base_url.clone()),
            AggregationFetcher::new(config.search.clone()),
        )
    }

    /// Run a validated search
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let compiled = self.compiler.compile(request);
        let body = serde_json::to_value(&compiled).map_err(EngineError::from)?;

        let raw = self.engine.search(&body).await.map_err(|e| {
            tracing::error!(
                index = self.engine.index(),
                page = request.page,
                page_size = request.page_size,
                "Error searching Elasticsearch: {}",
                e
            );
            record_engine_error("search", error_type(&e));
            Error::from(e)
        })?;

        let response = self.mapper.map_search(raw).map_err(|e| {
            tracing::error!("Search response failed validation: {}", e);
            Error::from(e)
        })?;

        tracing::debug!(
            total = response.total,
            returned = response.results.len(),
            "Search completed"
        );
        Ok(response)
    }

    /// Facet counts across the whole index
    pub async fn global_aggregations(&self) -> Result<GlobalAggregations> {
        let raw = self.fetcher.fetch(self.engine.as_ref()).await.map_err(|e| {
            tracing::error!(index = self.engine.index(), "Error fetching global aggregations: {}", e);
            record_engine_error("aggregations", error_type(&e));
            Error::AggregationEngine(e)
        })?;

        GlobalAggregations::from_raw(raw).map_err(|e| {
            tracing::error!("Aggregation response failed validation: {}", e);
            Error::AggregationShape(e)
        })
    }

    /// A single media record by engine id
    pub async fn get_media(&self, id: &str) -> Result<MediaHit> {
        let raw = self.engine.get_document(id).await.map_err(|e| {
            tracing::error!(index = self.engine.index(), "Error retrieving media item {}: {}", id, e);
            record_engine_error("get", error_type(&e));
            Error::from(e)
        })?;

        let raw = raw.ok_or_else(|| Error::NotFound(id.to_string()))?;

        self.mapper.map_document(raw).map_err(|e| {
            tracing::error!("Media item {} failed validation: {}", id, e);
            Error::from(e)
        })
    }
}

fn error_type(error: &EngineError) -> &'static str {
    match error {
        EngineError::Http(e) if e.is_timeout() => "timeout",
        EngineError::Http(e) if e.is_connect() => "connect",
        EngineError::Http(_) => "http",
        EngineError::Status { .. } => "status",
        EngineError::Encode(_) => "encode",
        EngineError::InvalidUrl(_) => "invalid_url",
    }
}
