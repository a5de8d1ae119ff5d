//! Embedded/local storage backend (Backend A): heed+arroy for vectors,
//! tantivy for BM25, no external services.

mod backend;
mod keyword;
mod vectors;

pub use backend::LocalStorageBackend;
