//! HTTP error taxonomy: every internal error maps onto one of these
//! before crossing the Axum boundary, per the status-code contract.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotReady(String),

    #[error("indexing error: {0}")]
    Indexing(#[from] agent_brain_indexing::IndexingError),

    #[error("query error: {0}")]
    Query(#[from] agent_brain_query::QueryError),

    #[error("storage error: {0}")]
    Storage(#[from] agent_brain_storage::StorageError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Indexing(error) => indexing_status(error),
            Self::Query(error) => query_status(error),
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { detail: self.to_string() })).into_response()
    }
}

fn indexing_status(error: &agent_brain_indexing::IndexingError) -> StatusCode {
    use agent_brain_indexing::IndexingError;
    match error {
        IndexingError::InvalidFolder(_) => StatusCode::BAD_REQUEST,
        IndexingError::QueueFull { .. } => StatusCode::CONFLICT,
        IndexingError::NotFound(_) => StatusCode::NOT_FOUND,
        IndexingError::TerminalJob { .. } => StatusCode::CONFLICT,
        IndexingError::DimensionMismatch { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn query_status(error: &agent_brain_query::QueryError) -> StatusCode {
    use agent_brain_query::QueryError;
    match error {
        QueryError::EmptyQuery
        | QueryError::QueryTooLong { .. }
        | QueryError::InvalidTopK { .. }
        | QueryError::InvalidAlpha
        | QueryError::GraphDisabled => StatusCode::BAD_REQUEST,
        QueryError::NotReady { .. } => StatusCode::SERVICE_UNAVAILABLE,
        QueryError::DimensionMismatch { .. } => StatusCode::CONFLICT,
        QueryError::Storage(_) | QueryError::Provider(_) | QueryError::Graph(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
