//! Shared test fixtures for every `agent-brain-*` crate: a shared test
//! runtime/counter, a temp state-dir helper, and deterministic mock
//! implementations of the provider and storage trait seams so integration
//! tests don't need real network calls or a real LMDB/Postgres instance.

pub mod embedding;
pub mod reranker;
pub mod storage;
pub mod summarization;

use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

static TEST_RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
static COLLECTION_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Shared Tokio runtime for integration tests that can't use
/// `#[tokio::test]` directly (e.g. blocking setup code).
#[allow(clippy::expect_used)]
pub fn get_test_runtime() -> &'static tokio::runtime::Runtime {
    TEST_RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("agent-brain-test")
            .build()
            .unwrap_or_else(|_| {
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("current-thread runtime construction cannot fail")
            })
    })
}

/// Monotonically increasing counter for unique collection/job names across
/// parallel test runs.
pub fn next_counter() -> usize {
    COLLECTION_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A fresh temp directory suitable for use as a state dir (runtime lock,
/// job store, local storage backend). Dropped (and removed) when the
/// returned guard goes out of scope.
///
/// # Panics
/// Panics if a temp directory cannot be created.
#[must_use]
#[allow(clippy::expect_used)]
pub fn temp_state_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("failed to create temp state dir")
}

pub use embedding::MockEmbeddingProvider;
pub use reranker::MockRerankerProvider;
pub use storage::MockStorageBackend;
pub use summarization::MockSummarizationProvider;
