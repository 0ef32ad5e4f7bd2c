use super::routes::{self, AppState};
use crate::config::CorsConfig;
use crate::service::SearchService;
use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct ApiServer {
    service: Arc<SearchService>,
    cors_config: CorsConfig,
    metrics: Option<PrometheusHandle>,
}

impl ApiServer {
    pub fn new(service: Arc<SearchService>) -> Self {
        Self::with_cors(service, CorsConfig::default())
    }

    pub fn with_cors(service: Arc<SearchService>, cors_config: CorsConfig) -> Self {
        Self {
            service,
            cors_config,
            metrics: None,
        }
    }

    /// Serve the given Prometheus recorder at `GET /metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build CORS layer from configuration
    fn build_cors_layer(&self) -> CorsLayer {
        if !self.cors_config.enabled {
            return CorsLayer::new();
        }

        let origins: Vec<HeaderValue> = self
            .cors_config
            .origins
            .iter()
            .filter(|o| o.as_str() != "*")
            .filter_map(|o| match o.parse() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                    None
                }
            })
            .collect();

        let has_wildcard = self.cors_config.origins.iter().any(|o| o == "*");

        let cors = if has_wildcard {
            CorsLayer::new().allow_origin(tower_http::cors::Any)
        } else if origins.is_empty() {
            CorsLayer::new()
        } else {
            CorsLayer::new().allow_origin(origins)
        };

        cors.allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers(tower_http::cors::Any)
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            service: self.service.clone(),
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/api/search", get(routes::search))
            .route("/api/search/", get(routes::search))
            .route("/api/aggregations", get(routes::aggregations))
            .route("/api/aggregations/", get(routes::aggregations))
            .route("/api/media/:id", get(routes::get_media))
            .route("/health", get(routes::health))
            .route("/metrics", get(routes::metrics))
            .with_state(state)
            .layer(self.build_cors_layer())
            .layer(TraceLayer::new_for_http())
    }

    pub async fn serve(self, addr: &str) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, self.router()).await
    }
}
