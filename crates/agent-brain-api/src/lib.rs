//! HTTP surface: bootstrap, shared state, error mapping, routes.

pub mod bootstrap;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;
