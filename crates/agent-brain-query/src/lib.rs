//! Query service: hybrid/hint-gated retrieval over the storage backend,
//! the graph index, and an optional cross-encoder reranker.

pub mod error;
pub mod models;
pub mod service;

pub use error::{QueryError, QueryResult};
pub use models::{CountResponse, QueryFilter, QueryMode, QueryRequest, QueryResponse, ScoredResult};
pub use service::QueryService;
