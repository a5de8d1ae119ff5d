//! Context-aware chunker: splits a document into overlapping chunks,
//! preferring semantic breakpoints over mid-line cuts. Chunk size and
//! overlap are measured in tokens (`TokenCounter`), not characters.

use sha2::{Digest, Sha256};

use crate::language::Language;
use crate::tokens::TokenCounter;

pub const MIN_CHUNK_SIZE: usize = 128;
pub const MAX_CHUNK_SIZE: usize = 2048;
pub const DEFAULT_CHUNK_SIZE: usize = 512;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// A breakpoint candidate considered "semantic": a blank line, a closing
/// brace at column 0, or a markdown heading. Checked in priority order
/// when looking for where to end a chunk near the target size.
const SEMANTIC_BREAK_MARKERS: &[&str] = &["\n\n", "\n}\n", "\n# ", "\n## ", "\n### "];

/// A chunk of a source document, ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub source_path: String,
    pub language: Option<Language>,
    /// `"code"` or `"doc"`, drawn from the closed set the storage backend
    /// metadata expects.
    pub source_type: &'static str,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub content_hash: String,
}

/// Target chunk size and overlap, both in tokens (per spec defaults:
/// 512/50).
#[derive(Debug, Clone, Copy)]
pub struct ChunkingOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingOptions {
    /// Clamp requested sizes into `[MIN_CHUNK_SIZE, MAX_CHUNK_SIZE]`.
    #[must_use]
    pub fn clamped(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE);
        let chunk_overlap = chunk_overlap.min(chunk_size.saturating_sub(1));
        Self {
            chunk_size,
            chunk_overlap,
        }
    }
}

fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Byte offset at or after `start` where the token count of
/// `text[start..offset]` first reaches `target_tokens`, found by binary
/// search over char-boundary offsets. BPE token counts grow
/// monotonically with input length, so the search is well-defined.
fn offset_for_token_count(counter: &dyn TokenCounter, text: &str, start: usize, target_tokens: usize) -> usize {
    let len = text.len();
    if start >= len || target_tokens == 0 {
        return start.min(len);
    }
    if counter.count(&text[start..len]) < target_tokens {
        return len;
    }

    let mut lo = start;
    let mut hi = len;
    while lo < hi {
        let mid = find_char_boundary(text, lo + (hi - lo) / 2);
        if mid == lo {
            break;
        }
        if counter.count(&text[start..mid]) < target_tokens {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    find_char_boundary(text, lo).max(start)
}

/// Byte offset `x` in `[start, end]` such that `text[x..end]` holds
/// approximately `overlap_tokens` tokens of trailing context, found by
/// binary search. Used to compute the next chunk's start so consecutive
/// chunks overlap by a token count rather than a character count.
fn offset_for_trailing_tokens(
    counter: &dyn TokenCounter,
    text: &str,
    start: usize,
    end: usize,
    overlap_tokens: usize,
) -> usize {
    if overlap_tokens == 0 || end <= start {
        return end;
    }

    let mut lo = start;
    let mut hi = end;
    while lo < hi {
        let mid = find_char_boundary(text, lo + (hi - lo) / 2);
        if mid == lo {
            break;
        }
        if counter.count(&text[mid..end]) > overlap_tokens {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    find_char_boundary(text, lo)
}

/// Find the best split point in `[target, max(target, hard_max)]` of
/// `text` (byte offsets), preferring a semantic breakpoint closest to
/// (but not before) `target`. Falls back to exactly `target` if no
/// semantic breakpoint is found within the window.
fn find_break_point(text: &str, target: usize, hard_max: usize) -> usize {
    let window_end = hard_max.min(text.len());
    if target >= text.len() {
        return text.len();
    }

    let search_window = &text[target..window_end];
    let mut best: Option<usize> = None;
    for marker in SEMANTIC_BREAK_MARKERS {
        if let Some(pos) = search_window.find(marker) {
            let absolute = target + pos + marker.len();
            best = Some(best.map_or(absolute, |b: usize| b.min(absolute)));
        }
    }
    best.unwrap_or(target)
}

/// Split `text` into overlapping chunks of `options.chunk_size` tokens
/// with `options.chunk_overlap` tokens of overlap, counted by `counter`.
/// Empty chunks are never emitted - a document that is entirely
/// whitespace yields zero chunks.
#[must_use]
pub fn chunk_text(
    source_path: &str,
    language: Option<&Language>,
    source_type: &'static str,
    text: &str,
    options: ChunkingOptions,
) -> Vec<Chunk> {
    chunk_text_with_counter(
        source_path,
        language,
        source_type,
        text,
        options,
        crate::tokens::default_counter(),
    )
}

/// Same as [`chunk_text`], but with an explicit [`TokenCounter`] instead
/// of the default cl100k_base one - lets callers match a specific
/// embedding model's tokenizer, or use a cheap fake one in tests.
#[must_use]
pub fn chunk_text_with_counter(
    source_path: &str,
    language: Option<&Language>,
    source_type: &'static str,
    text: &str,
    options: ChunkingOptions,
    counter: &dyn TokenCounter,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let len = text.len();

    while start < len {
        let target_end = offset_for_token_count(counter, text, start, options.chunk_size);
        let hard_max = offset_for_token_count(counter, text, start, options.chunk_size * 2);
        let end = if target_end >= len {
            len
        } else {
            find_break_point(text, target_end, hard_max)
        };

        // SAFETY-equivalent: `start`/`end` are byte offsets derived from
        // token-count binary search and marker search, so they usually
        // land on char boundaries already. Guard explicitly rather than
        // assume.
        let end = find_char_boundary(text, end);
        let start_boundary = find_char_boundary(text, start);

        let slice = &text[start_boundary..end];
        let trimmed = slice.trim();
        if !trimmed.is_empty() {
            chunks.push(Chunk {
                source_path: source_path.to_string(),
                language: language.cloned(),
                source_type,
                text: slice.to_string(),
                start_offset: start_boundary,
                end_offset: end,
                content_hash: content_hash(slice),
            });
        }

        if end <= start_boundary {
            break;
        }
        let next_start = offset_for_trailing_tokens(counter, text, start_boundary, end, options.chunk_overlap);
        start = if next_start > start_boundary {
            next_start
        } else {
            end
        };
    }

    chunks
}

fn find_char_boundary(text: &str, mut offset: usize) -> usize {
    while offset < text.len() && !text.is_char_boundary(offset) {
        offset += 1;
    }
    offset.min(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_emits_empty_chunks() {
        let chunks = chunk_text("f.txt", None, "doc", "   \n\n   ", ChunkingOptions::default());
        assert!(chunks.is_empty());
    }

    #[test]
    fn short_document_is_a_single_chunk() {
        let text = "fn main() {\n    println!(\"hi\");\n}\n";
        let chunks = chunk_text("f.rs", None, "code", text, ChunkingOptions::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text.trim(), text.trim());
    }

    #[test]
    fn long_document_splits_with_overlap() {
        let paragraph = "word ".repeat(50);
        let text = format!("{paragraph}\n\n{paragraph}\n\n{paragraph}\n\n{paragraph}");
        let options = ChunkingOptions::clamped(128, 20);
        let chunks = chunk_text("f.txt", None, "doc", &text, options);
        assert!(chunks.len() > 1, "expected multiple chunks, got {}", chunks.len());
        for chunk in &chunks {
            assert!(!chunk.text.trim().is_empty());
        }
    }

    #[test]
    fn clamped_respects_bounds() {
        let options = ChunkingOptions::clamped(10, 5);
        assert_eq!(options.chunk_size, MIN_CHUNK_SIZE);
        let options = ChunkingOptions::clamped(100_000, 5);
        assert_eq!(options.chunk_size, MAX_CHUNK_SIZE);
    }

    #[test]
    fn content_hash_is_stable_for_identical_text() {
        let a = chunk_text("a.txt", None, "doc", "hello world", ChunkingOptions::default());
        let b = chunk_text("b.txt", None, "doc", "hello world", ChunkingOptions::default());
        assert_eq!(a[0].content_hash, b[0].content_hash);
    }

    /// Counts whitespace-separated words as tokens - deterministic and
    /// cheap, standing in for a real tokenizer in tests that care about
    /// sizing behavior rather than exact subword counts.
    struct WordCounter;

    impl TokenCounter for WordCounter {
        fn name(&self) -> &str {
            "word-counter"
        }

        fn max_tokens(&self) -> usize {
            usize::MAX
        }

        fn count(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    #[test]
    fn chunk_size_is_measured_in_tokens_not_characters() {
        // "word" is 4 bytes; a char/byte-based splitter targeting 60
        // would cut after ~60 bytes (well under 40 words), not ~60 tokens
        // as counted by `WordCounter`.
        let paragraph = "word ".repeat(40);
        let text = format!("{paragraph}\n\n{paragraph}\n\n{paragraph}");
        let options = ChunkingOptions {
            chunk_size: 60,
            chunk_overlap: 5,
        };
        let chunks = chunk_text_with_counter("f.txt", None, "doc", &text, options, &WordCounter);

        assert!(chunks.len() > 1, "expected multiple chunks, got {}", chunks.len());
        for chunk in &chunks {
            let word_count = chunk.text.split_whitespace().count();
            assert!(
                word_count <= 130,
                "chunk had {word_count} words, expected roughly chunk_size*2 tokens or fewer"
            );
        }
    }

    #[test]
    fn overlap_is_measured_in_tokens() {
        let paragraph = "word ".repeat(40);
        let text = format!("{paragraph}\n\n{paragraph}\n\n{paragraph}");
        let options = ChunkingOptions {
            chunk_size: 60,
            chunk_overlap: 10,
        };
        let chunks = chunk_text_with_counter("f.txt", None, "doc", &text, options, &WordCounter);
        assert!(chunks.len() > 1);

        // Consecutive chunks should share some trailing/leading words
        // given a non-zero token overlap.
        let first_words: Vec<&str> = chunks[0].text.split_whitespace().collect();
        let second_words: Vec<&str> = chunks[1].text.split_whitespace().collect();
        let tail: std::collections::HashSet<&&str> = first_words.iter().rev().take(10).collect();
        let overlap_found = second_words.iter().take(10).any(|w| tail.contains(w));
        assert!(overlap_found, "expected some shared words between consecutive chunks");
    }
}
