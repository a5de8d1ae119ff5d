//! `/query` routes: mode-dispatched retrieval and the readiness count.

use agent_brain_query::{CountResponse, QueryRequest, QueryResponse};
use axum::Json;
use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/query/", post(query))
        .route("/query/count", get(count))
}

#[utoipa::path(
    post,
    path = "/query/",
    tag = "query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Ranked search results", body = QueryResponse),
        (status = 400, description = "Empty or oversized query"),
        (status = 503, description = "Service not ready"),
        (status = 409, description = "Embedding dimension mismatch"),
    )
)]
async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<Json<QueryResponse>> {
    let response = state.query_service.query(request).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/query/count",
    tag = "query",
    responses((status = 200, description = "Total indexed chunk count and readiness", body = CountResponse)),
)]
async fn count(State(state): State<AppState>) -> ApiResult<Json<CountResponse>> {
    let response = state.query_service.count().await?;
    Ok(Json(response))
}
