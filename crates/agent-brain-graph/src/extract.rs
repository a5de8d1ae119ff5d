//! Triplet extraction: rule-based (AST/metadata-driven heuristics for
//! code, via regex over common declaration/import/inheritance shapes) and
//! LLM-based (few-shot triplet extraction through the summarization
//! provider seam, capped per chunk).

use std::sync::OnceLock;
use std::sync::Arc;

use agent_brain_providers::SummarizationProvider;
use regex::Regex;

use crate::error::GraphResult;
use crate::model::Edge;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triplet {
    pub src: String,
    pub relation: String,
    pub dst: String,
}

struct RulePattern {
    language: &'static str,
    relation: &'static str,
    regex: &'static str,
}

const RULE_PATTERNS: &[RulePattern] = &[
    RulePattern { language: "rust", relation: "defines_function", regex: r"(?m)^\s*(?:pub\s+)?fn\s+(\w+)" },
    RulePattern { language: "rust", relation: "imports", regex: r"(?m)^\s*use\s+([\w:]+)" },
    RulePattern { language: "python", relation: "defines_function", regex: r"(?m)^\s*def\s+(\w+)" },
    RulePattern { language: "python", relation: "imports", regex: r"(?m)^\s*import\s+(\w+)" },
    RulePattern { language: "python", relation: "extends", regex: r"(?m)^\s*class\s+(\w+)\s*\((\w+)" },
    RulePattern { language: "javascript", relation: "defines_function", regex: r"(?m)\bfunction\s+(\w+)" },
    RulePattern { language: "javascript", relation: "imports", regex: r#"(?m)^\s*import\s+.*from\s+['"]([\w./-]+)['"]"# },
    RulePattern { language: "typescript", relation: "defines_function", regex: r"(?m)\bfunction\s+(\w+)" },
    RulePattern { language: "typescript", relation: "imports", regex: r#"(?m)^\s*import\s+.*from\s+['"]([\w./-]+)['"]"# },
    RulePattern { language: "go", relation: "defines_function", regex: r"(?m)^func\s+(\w+)" },
    RulePattern { language: "go", relation: "imports", regex: r#"(?m)^\s*"([\w./-]+)""# },
    RulePattern { language: "java", relation: "extends", regex: r"(?m)\bclass\s+(\w+)\s+extends\s+(\w+)" },
];

fn compiled_patterns() -> &'static Vec<(Regex, &'static str, &'static str)> {
    static CELL: OnceLock<Vec<(Regex, &'static str, &'static str)>> = OnceLock::new();
    CELL.get_or_init(|| {
        RULE_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p.regex).ok().map(|re| (re, p.language, p.relation)))
            .collect()
    })
}

/// Extract triplets from declaration/import/inheritance shapes matching
/// `language`. `source` is the entity the extracted names relate to - the
/// file or module the chunk came from.
#[must_use]
pub fn rule_based_extract(source: &str, language: Option<&str>, text: &str) -> Vec<Triplet> {
    let Some(language) = language else {
        return Vec::new();
    };
    let mut triplets = Vec::new();
    for (regex, pattern_language, relation) in compiled_patterns() {
        if *pattern_language != language {
            continue;
        }
        for captures in regex.captures_iter(text) {
            if captures.len() >= 3 {
                if let (Some(subject), Some(object)) = (captures.get(1), captures.get(2)) {
                    triplets.push(Triplet {
                        src: subject.as_str().to_string(),
                        relation: (*relation).to_string(),
                        dst: object.as_str().to_string(),
                    });
                }
            } else if let Some(object) = captures.get(1) {
                triplets.push(Triplet {
                    src: source.to_string(),
                    relation: (*relation).to_string(),
                    dst: object.as_str().to_string(),
                });
            }
        }
    }
    triplets
}

const LLM_PROMPT_PREFIX: &str = "Extract factual (subject, relation, object) triplets from the \
following text. Reply with one triplet per line, formatted exactly as \
`subject | relation | object`, with no other commentary. If none, reply with an empty response.\n\n";

/// Ask the LLM for up to `cap` triplets describing `text`. Best-effort:
/// malformed lines in the response are skipped rather than failing the
/// whole call.
///
/// # Errors
/// Propagates the provider's error if the call itself fails.
pub async fn llm_extract(
    provider: &Arc<dyn SummarizationProvider>,
    text: &str,
    cap: usize,
) -> GraphResult<Vec<Triplet>> {
    let prompt = format!("{LLM_PROMPT_PREFIX}{text}");
    let response = provider.summarize(&prompt).await?;
    let triplets = response
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.splitn(3, '|').map(str::trim).collect();
            match parts.as_slice() {
                [src, relation, dst] if !src.is_empty() && !relation.is_empty() && !dst.is_empty() => {
                    Some(Triplet {
                        src: (*src).to_string(),
                        relation: (*relation).to_string(),
                        dst: (*dst).to_string(),
                    })
                }
                _ => None,
            }
        })
        .take(cap)
        .collect();
    Ok(triplets)
}

#[must_use]
pub fn triplets_to_edges(triplets: Vec<Triplet>, provenance_chunk_id: &str) -> Vec<Edge> {
    triplets
        .into_iter()
        .map(|t| Edge {
            src: t.src,
            relation: t.relation,
            dst: t.dst,
            provenance_chunk_id: provenance_chunk_id.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_rust_function_definitions() {
        let triplets = rule_based_extract("main.rs", Some("rust"), "pub fn hello() {}\nfn world() {}");
        assert!(triplets.iter().any(|t| t.dst == "hello"));
        assert!(triplets.iter().any(|t| t.dst == "world"));
    }

    #[test]
    fn extracts_python_inheritance() {
        let triplets = rule_based_extract("m.py", Some("python"), "class Dog(Animal):\n    pass");
        assert!(triplets
            .iter()
            .any(|t| t.src == "Dog" && t.relation == "extends" && t.dst == "Animal"));
    }

    #[test]
    fn unknown_language_yields_nothing() {
        let triplets = rule_based_extract("m.txt", Some("plaintext"), "whatever");
        assert!(triplets.is_empty());
    }

    #[test]
    fn no_language_yields_nothing() {
        let triplets = rule_based_extract("m.txt", None, "whatever");
        assert!(triplets.is_empty());
    }
}
