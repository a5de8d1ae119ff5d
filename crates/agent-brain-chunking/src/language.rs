//! Language detection: path-based first, content-based anchor scan as fallback
//!
//! Detection is pure - it never re-reads from disk, only the bytes the
//! loader already read.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Minimum anchor score required before content-based detection commits to
/// a language; below this threshold the file is left as `None`.
const CONTENT_DETECTION_THRESHOLD: u32 = 2;

/// A detected (or declared) language tag. Kept as a plain string rather
/// than a closed enum so new extensions can be added to the table without
/// a breaking API change.
pub type Language = String;

fn extension_table() -> &'static HashMap<&'static str, &'static str> {
    static TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            ("rs", "rust"),
            ("py", "python"),
            ("js", "javascript"),
            ("mjs", "javascript"),
            ("cjs", "javascript"),
            ("jsx", "javascript"),
            ("ts", "typescript"),
            ("tsx", "typescript"),
            ("go", "go"),
            ("java", "java"),
            ("c", "c"),
            ("h", "c"),
            ("cpp", "cpp"),
            ("cc", "cpp"),
            ("hpp", "cpp"),
            ("cs", "csharp"),
            ("rb", "ruby"),
            ("php", "php"),
            ("sh", "bash"),
            ("bash", "bash"),
            ("sql", "sql"),
            ("json", "json"),
            ("yaml", "yaml"),
            ("yml", "yaml"),
            ("toml", "toml"),
            ("xml", "xml"),
            ("html", "html"),
            ("md", "markdown"),
            ("mdx", "markdown"),
            ("rst", "restructuredtext"),
            ("txt", "text"),
        ])
    })
}

/// Anchor patterns scanned in content-based fallback detection: `(language,
/// substring, weight)`. Patterns are checked in order; a file's score for a
/// language is the sum of weights of every pattern that matches.
fn anchor_patterns() -> &'static [(&'static str, &'static str, u32)] {
    static PATTERNS: OnceLock<Vec<(&'static str, &'static str, u32)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            ("python", "def ", 1),
            ("python", "import ", 1),
            ("python", "from __future__", 2),
            ("rust", "fn main(", 2),
            ("rust", "use std::", 2),
            ("rust", "impl ", 1),
            ("javascript", "require(", 1),
            ("javascript", "module.exports", 2),
            ("javascript", "=> {", 1),
            ("typescript", "interface ", 1),
            ("typescript", ": string", 1),
            ("go", "package main", 2),
            ("go", "func ", 1),
            ("java", "public class ", 2),
            ("java", "import java.", 2),
            ("bash", "#!/bin/bash", 3),
            ("bash", "#!/usr/bin/env bash", 3),
            ("bash", "#!/bin/sh", 3),
        ]
    })
}

/// Path-based detection: extension lookup, case-insensitive.
#[must_use]
pub fn detect_from_path(path: &std::path::Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    extension_table().get(ext.as_str()).map(|s| (*s).to_string())
}

/// Content-based fallback: score anchor pattern matches, return the
/// highest scorer if it clears [`CONTENT_DETECTION_THRESHOLD`].
#[must_use]
pub fn detect_from_content(bytes: &[u8]) -> Option<Language> {
    let text = String::from_utf8_lossy(bytes);
    let mut scores: HashMap<&'static str, u32> = HashMap::new();
    for (language, pattern, weight) in anchor_patterns() {
        if text.contains(pattern) {
            *scores.entry(language).or_insert(0) += weight;
        }
    }
    scores
        .into_iter()
        .max_by_key(|(_, score)| *score)
        .filter(|(_, score)| *score >= CONTENT_DETECTION_THRESHOLD)
        .map(|(language, _)| language.to_string())
}

/// Run both phases: path-based first, content-based fallback if the path
/// gives no answer.
#[must_use]
pub fn detect_language(path: &std::path::Path, bytes: &[u8]) -> Option<Language> {
    detect_from_path(path).or_else(|| detect_from_content(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn detects_from_extension() {
        assert_eq!(
            detect_from_path(Path::new("src/main.rs")),
            Some("rust".to_string())
        );
    }

    #[test]
    fn unknown_extension_falls_through_to_content() {
        let bytes = b"#!/bin/bash\necho hello\n";
        assert_eq!(detect_language(Path::new("run"), bytes), Some("bash".to_string()));
    }

    #[test]
    fn weak_content_signal_stays_undetected() {
        let bytes = b"hello there, nothing special here";
        assert_eq!(detect_from_content(bytes), None);
    }
}
