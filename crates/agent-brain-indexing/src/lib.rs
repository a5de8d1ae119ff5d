//! Indexing pipeline, job queue, and background worker.
//!
//! [`store::JobStore`] owns job records and dedupe. [`pipeline::Pipeline`]
//! runs loader -> chunker -> embedder -> storage for a single job.
//! [`worker::Worker`] ties the two together: pop, run with retries and a
//! soft deadline, persist the terminal state.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod store;
pub mod worker;

pub use error::{IndexingError, IndexingResult};
pub use models::{IndexRequest, JobProgress, JobRecord, JobStatus, Operation};
pub use pipeline::{CancellationProbe, Pipeline, PipelineCheckpoint, PipelineOutcome};
pub use store::JobStore;
pub use worker::{Worker, WorkerConfig};
