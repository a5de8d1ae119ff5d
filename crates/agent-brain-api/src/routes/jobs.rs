//! `/jobs` routes: paginated listing, detail lookup, cancellation.

use agent_brain_indexing::{IndexingError, JobRecord, JobStatus};
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{delete, get};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs/", get(list_jobs))
        .route("/jobs/{id}", get(get_job))
        .route("/jobs/{id}", delete(cancel_job))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Serialize, ToSchema)]
struct QueueStats {
    pending: usize,
    running: usize,
    completed: usize,
    failed: usize,
    cancelled: usize,
}

fn queue_stats(jobs: &[JobRecord]) -> QueueStats {
    let mut stats = QueueStats {
        pending: 0,
        running: 0,
        completed: 0,
        failed: 0,
        cancelled: 0,
    };
    for job in jobs {
        match job.status {
            JobStatus::Pending => stats.pending += 1,
            JobStatus::Running => stats.running += 1,
            JobStatus::Completed => stats.completed += 1,
            JobStatus::Failed => stats.failed += 1,
            JobStatus::Cancelled => stats.cancelled += 1,
        }
    }
    stats
}

#[derive(Debug, Serialize, ToSchema)]
struct JobListResponse {
    jobs: Vec<JobRecord>,
    total: usize,
    stats: QueueStats,
}

async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<JobListResponse> {
    let (jobs, total) = state.job_store.list(params.limit, params.offset).await;
    let (all_jobs, _) = state.job_store.list(usize::MAX, 0).await;
    Json(JobListResponse {
        stats: queue_stats(&all_jobs),
        jobs,
        total,
    })
}

async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> ApiResult<Json<JobRecord>> {
    state
        .job_store
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::from(IndexingError::NotFound(id)))
}

#[derive(Debug, Serialize, ToSchema)]
struct CancelResponse {
    job_id: uuid::Uuid,
    status: &'static str,
    message: String,
}

async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> ApiResult<Json<CancelResponse>> {
    let job = state.job_store.cancel(id).await.map_err(ApiError::from)?;
    let message = if job.status == JobStatus::Cancelled && job.started_at.is_none() {
        "job cancelled before it started running".to_string()
    } else {
        "cancellation requested; job will stop at its next checkpoint".to_string()
    };
    Ok(Json(CancelResponse {
        job_id: job.id,
        status: job.status.as_str(),
        message,
    }))
}
