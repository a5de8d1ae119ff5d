//! Common utilities and patterns shared across Agent Brain crates
//!
//! This crate provides shared functionality to reduce duplication across
//! the various Agent Brain components: a correlation id for cross-component
//! tracing, a lightweight error-context trait, and process-wide init helpers.

pub mod correlation;
pub mod error;
pub mod init;
pub mod tracing_init;

pub use correlation::CorrelationId;
pub use error::{CommonError, ErrorContext};
pub use init::initialize_environment;
pub use tracing_init::init_tracing;
