//! Error types for the search API

use crate::engine::EngineError;
use crate::request::ValidationErrors;
use crate::response::ShapeError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Search API errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid search parameters: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Search engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Unexpected engine response shape: {0}")]
    Shape(#[from] ShapeError),

    #[error("Aggregation engine error: {0}")]
    AggregationEngine(#[source] EngineError),

    #[error("Unexpected aggregation response shape: {0}")]
    AggregationShape(#[source] ShapeError),

    #[error("Media item not found: {0}")]
    NotFound(String),
}

/// Generic error body; internal details stay in the server log
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Engine(_)
            | Self::Shape(_)
            | Self::AggregationEngine(_)
            | Self::AggregationShape(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Invalid search parameters",
            Self::NotFound(_) => "Media item not found",
            Self::Engine(_) => "An error occurred while querying the search engine",
            Self::Shape(_) => "Error processing search results",
            Self::AggregationEngine(_) => "An error occurred while fetching aggregations",
            Self::AggregationShape(_) => "Error processing aggregations",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self {
            // Field errors are the client's to fix, so they go out verbatim
            Self::Validation(errors) => (status, axum::Json(errors)).into_response(),
            other => {
                let body = ErrorResponse {
                    error: other.public_message(),
                };
                (status, axum::Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_renders_field_map() {
        let mut errors = ValidationErrors::default();
        errors.add("page", "Ensure this value is greater than or equal to 1.");

        let response = Error::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"page": ["Ensure this value is greater than or equal to 1."]})
        );
    }

    #[tokio::test]
    async fn test_engine_error_hides_detail() {
        let err = Error::Engine(EngineError::Status {
            status: 503,
            body: "cluster_block_exception: secret detail".to_string(),
        });

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(
            body,
            json!({"error": "An error occurred while querying the search engine"})
        );
    }

    #[tokio::test]
    async fn test_shape_error_is_server_error() {
        let err = Error::Shape(ShapeError::new("results[0]", "missing field `datum`"));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Error processing search results"})
        );
    }

    #[tokio::test]
    async fn test_aggregation_errors_have_own_messages() {
        let engine = Error::AggregationEngine(EngineError::Status {
            status: 500,
            body: "search_phase_execution_exception".to_string(),
        })
        .into_response();
        assert_eq!(engine.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(engine).await,
            json!({"error": "An error occurred while fetching aggregations"})
        );

        let shape = Error::AggregationShape(ShapeError::new("aggregations", "missing `all_docs`"))
            .into_response();
        assert_eq!(shape.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(shape).await,
            json!({"error": "Error processing aggregations"})
        );
    }

    #[tokio::test]
    async fn test_not_found() {
        let response = Error::NotFound("42".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Media item not found"})
        );
    }
}
