//! `/index` routes: enqueue, additive enqueue, reset.

use agent_brain_indexing::{IndexRequest, JobStatus, Operation};
use axum::extract::State;
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/index/", post(index))
        .route("/index/add", post(index_add))
        .route("/index/", delete(reset))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IndexBody {
    pub folder_path: String,
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub chunk_overlap: Option<usize>,
    #[serde(default)]
    pub recursive: Option<bool>,
    #[serde(default)]
    pub include_code: Option<bool>,
}

impl From<IndexBody> for IndexRequest {
    fn from(body: IndexBody) -> Self {
        Self {
            folder_path: body.folder_path,
            chunk_size: body.chunk_size,
            chunk_overlap: body.chunk_overlap,
            recursive: body.recursive,
            include_code: body.include_code,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IndexAccepted {
    pub job_id: uuid::Uuid,
    pub status: &'static str,
    pub message: String,
}

fn validate_folder(folder_path: &str) -> ApiResult<()> {
    if folder_path.trim().is_empty() || !std::path::Path::new(folder_path).exists() {
        return Err(ApiError::Validation(format!(
            "folder does not exist or is not readable: {folder_path}"
        )));
    }
    Ok(())
}

async fn enqueue(
    state: &AppState,
    operation: Operation,
    body: IndexBody,
) -> ApiResult<(axum::http::StatusCode, Json<IndexAccepted>)> {
    validate_folder(&body.folder_path)?;
    let request: IndexRequest = body.into();

    let job_id = state
        .job_store
        .enqueue(operation, request, state.config.server.max_queue)
        .await
        .map_err(ApiError::from)?;

    let status = state.job_store.get(job_id).await.map(|job| job.status);
    let (status_code, message) = match status {
        Some(JobStatus::Running) => (
            axum::http::StatusCode::CONFLICT,
            "a job for this folder is already running".to_string(),
        ),
        _ => (
            axum::http::StatusCode::ACCEPTED,
            "indexing job enqueued".to_string(),
        ),
    };

    Ok((
        status_code,
        Json(IndexAccepted {
            job_id,
            status: status.unwrap_or(JobStatus::Pending).as_str(),
            message,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/index/",
    tag = "index",
    request_body = IndexBody,
    responses(
        (status = 202, description = "Indexing job enqueued", body = IndexAccepted),
        (status = 400, description = "Invalid or inaccessible folder"),
        (status = 409, description = "Dedupe hit against a running job"),
    )
)]
async fn index(
    State(state): State<AppState>,
    Json(body): Json<IndexBody>,
) -> ApiResult<(axum::http::StatusCode, Json<IndexAccepted>)> {
    enqueue(&state, Operation::Index, body).await
}

#[utoipa::path(
    post,
    path = "/index/add",
    tag = "index",
    request_body = IndexBody,
    responses(
        (status = 202, description = "Indexing job enqueued", body = IndexAccepted),
        (status = 400, description = "Invalid or inaccessible folder"),
        (status = 409, description = "Dedupe hit against a running job"),
    )
)]
async fn index_add(
    State(state): State<AppState>,
    Json(body): Json<IndexBody>,
) -> ApiResult<(axum::http::StatusCode, Json<IndexAccepted>)> {
    enqueue(&state, Operation::IndexAdd, body).await
}

async fn reset(State(state): State<AppState>) -> ApiResult<axum::http::StatusCode> {
    let (jobs, _) = state.job_store.list(usize::MAX, 0).await;
    if jobs.iter().any(|job| job.status == JobStatus::Running) {
        return Err(ApiError::Conflict(
            "cannot reset while an indexing job is running".to_string(),
        ));
    }

    state.storage.reset().await.map_err(ApiError::from)?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
