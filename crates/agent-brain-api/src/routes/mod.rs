//! HTTP route modules, merged into one router over [`AppState`](crate::state::AppState).

pub mod health;
pub mod index;
pub mod jobs;
pub mod query;

use axum::Router;

use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(index::router())
        .merge(jobs::router())
        .merge(query::router())
        .merge(crate::openapi::swagger_ui())
}
