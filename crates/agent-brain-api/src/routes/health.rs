//! `/health` routes: liveness, indexing snapshot, backend diagnostics.

use agent_brain_indexing::{JobRecord, JobStatus};
use agent_brain_storage::PoolDiagnostics;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health/", get(health))
        .route("/health/status", get(status))
        .route("/health/{backend}", get(backend_diagnostics))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
enum HealthState {
    Healthy,
    Indexing,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: HealthState,
    message: String,
    timestamp: DateTime<Utc>,
    version: &'static str,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (jobs, total) = state.job_store.list(usize::MAX, 0).await;
    let any_running = jobs.iter().any(|j| j.status == JobStatus::Running);
    let warnings = state.config.validate_all();
    let critical = warnings
        .iter()
        .any(|(severity, _)| *severity == agent_brain_config::Severity::Critical);

    let (status, message) = if any_running {
        (HealthState::Indexing, "an indexing job is currently running".to_string())
    } else if critical {
        (HealthState::Unhealthy, "critical configuration problem detected".to_string())
    } else if !warnings.is_empty() {
        (HealthState::Degraded, "non-critical configuration warnings present".to_string())
    } else {
        (HealthState::Healthy, format!("{total} jobs recorded, no active issues"))
    };

    Json(HealthResponse {
        status,
        message,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize, ToSchema)]
struct IndexingSnapshot {
    total_jobs: usize,
    completed_jobs: usize,
    failed_jobs: usize,
    in_progress: bool,
    current_job_id: Option<uuid::Uuid>,
    progress_percent: Option<f32>,
    last_completed_at: Option<DateTime<Utc>>,
    indexed_folders: Vec<String>,
}

fn progress_percent(job: &JobRecord) -> Option<f32> {
    let total_files = job.progress.files_total?;
    if total_files == 0 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    Some((job.progress.files_processed as f32 / total_files as f32) * 100.0)
}

async fn status(State(state): State<AppState>) -> Json<IndexingSnapshot> {
    let (jobs, total) = state.job_store.list(usize::MAX, 0).await;

    let completed_jobs = jobs.iter().filter(|j| j.status == JobStatus::Completed).count();
    let failed_jobs = jobs.iter().filter(|j| j.status == JobStatus::Failed).count();
    let current = jobs.iter().find(|j| j.status == JobStatus::Running);

    let last_completed_at = jobs
        .iter()
        .filter(|j| j.status == JobStatus::Completed)
        .filter_map(|j| j.completed_at)
        .max();

    let mut indexed_folders: Vec<String> = jobs
        .iter()
        .filter(|j| j.status == JobStatus::Completed)
        .map(|j| j.request.folder_path.clone())
        .collect();
    indexed_folders.sort();
    indexed_folders.dedup();

    Json(IndexingSnapshot {
        total_jobs: total,
        completed_jobs,
        failed_jobs,
        in_progress: current.is_some(),
        current_job_id: current.map(|j| j.id),
        progress_percent: current.and_then(progress_percent),
        last_completed_at,
        indexed_folders,
    })
}

#[derive(Debug, Serialize, ToSchema)]
struct BackendDiagnostics {
    backend: String,
    pool: Option<PoolDiagnostics>,
}

async fn backend_diagnostics(
    State(state): State<AppState>,
    Path(backend): Path<String>,
) -> ApiResult<Json<BackendDiagnostics>> {
    let configured = configured_backend_name(state.config.storage.backend);
    let requested = normalize_backend_name(&backend);
    if requested != configured {
        return Err(ApiError::NotFound(format!(
            "backend '{backend}' is not the currently configured backend ('{configured}')"
        )));
    }

    Ok(Json(BackendDiagnostics {
        backend: configured.to_string(),
        pool: state.storage.pool_diagnostics(),
    }))
}

fn configured_backend_name(backend: agent_brain_config::StorageBackend) -> &'static str {
    match backend {
        agent_brain_config::StorageBackend::Chroma => "local",
        agent_brain_config::StorageBackend::Postgres => "postgres",
    }
}

fn normalize_backend_name(name: &str) -> &'static str {
    match name.to_lowercase().as_str() {
        "postgres" | "postgresql" => "postgres",
        _ => "local",
    }
}
