use crate::aggregations::GlobalAggregations;
use crate::error::Error;
use crate::metrics::{record_validation_failure, RequestTimer};
use crate::request::SearchRequest;
use crate::response::{MediaHit, SearchResponse};
use crate::service::SearchService;
use axum::{
    extract::{Path, RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SearchService>,
    pub metrics: Option<PrometheusHandle>,
}

fn status_label(result: &Result<impl Sized, Error>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(Error::Validation(_)) => "invalid",
        Err(Error::NotFound(_)) => "not_found",
        Err(_) => "error",
    }
}

/// GET /api/search
///
/// Parameters come from the raw query string so that `db` and
/// `photographer` can repeat.
pub async fn search(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<SearchResponse>, Error> {
    let timer = RequestTimer::start("search");

    let result = match SearchRequest::from_query_string(query.as_deref().unwrap_or_default()) {
        Ok(request) => state.service.search(&request).await,
        Err(errors) => {
            tracing::debug!("Rejected search request: {}", errors);
            record_validation_failure(errors.fields());
            Err(Error::Validation(errors))
        }
    };

    timer.finish(status_label(&result));
    result.map(Json)
}

/// GET /api/aggregations
pub async fn aggregations(
    State(state): State<AppState>,
) -> Result<Json<GlobalAggregations>, Error> {
    let timer = RequestTimer::start("aggregations");
    let result = state.service.global_aggregations().await;
    timer.finish(status_label(&result));
    result.map(Json)
}

/// GET /api/media/:id
pub async fn get_media(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MediaHit>, Error> {
    let timer = RequestTimer::start("media");
    let result = state.service.get_media(&id).await;
    timer.finish(status_label(&result));
    result.map(Json)
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /metrics - Prometheus text exposition
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
