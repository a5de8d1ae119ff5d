//! Document loading, language detection, and context-aware chunking
//!
//! The loader walks a folder, the language detector tags each file, and
//! the chunker splits file contents into overlapping, non-empty chunks
//! ready for embedding.

pub mod chunker;
pub mod error;
pub mod language;
pub mod loader;
pub mod tokens;

pub use chunker::{chunk_text, chunk_text_with_counter, Chunk, ChunkingOptions};
pub use error::{ChunkingError, ChunkingResult};
pub use language::{detect_language, Language};
pub use loader::{load_documents, source_type_for, LoadedDocument, LoaderOptions};
pub use tokens::{default_counter, TiktokenCounter, TokenCounter};
