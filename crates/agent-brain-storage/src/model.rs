//! Storage-layer data model: documents going in, search results coming out

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single document being upserted. All four parallel arrays in
/// [`crate::traits::StorageBackend::upsert_documents`] are zipped into one
/// of these per call site convenience; the trait itself still takes arrays
/// so a single atomic call can validate equal lengths up front.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentMetadata {
    pub source_path: String,
    pub language: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub source_type: Option<String>,
    pub extra: serde_json::Value,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            source_path: String::new(),
            language: None,
            title: None,
            summary: None,
            source_type: None,
            extra: serde_json::Value::Null,
        }
    }
}

/// Optional filter applied before top-k cutoff in `keyword_search`, or as a
/// metadata containment filter in `vector_search`.
#[derive(Debug, Clone, Default)]
pub struct MetadataFilter {
    pub source_types: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
}

impl MetadataFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source_types.is_none() && self.languages.is_none()
    }

    #[must_use]
    pub fn matches(&self, metadata: &DocumentMetadata) -> bool {
        if let Some(types) = &self.source_types {
            let matches_type = metadata
                .source_type
                .as_deref()
                .is_some_and(|t| types.iter().any(|want| want == t));
            if !matches_type {
                return false;
            }
        }
        if let Some(languages) = &self.languages {
            let matches_lang = metadata
                .language
                .as_deref()
                .is_some_and(|l| languages.iter().any(|want| want == l));
            if !matches_lang {
                return false;
            }
        }
        true
    }
}

/// Transient search hit: `{chunk_id, text, metadata, score, component scores}`.
/// Score is normalised to `[0, 1]` within a single query; higher is better.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchResult {
    pub chunk_id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
    pub score: f32,
    pub vector_score: Option<f32>,
    pub bm25_score: Option<f32>,
    pub rerank_score: Option<f32>,
}

/// Distance metric used by vector search, and the formula that normalizes
/// its raw distance to a `[0, 1]` similarity score (higher is better).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    Cosine,
    L2,
    InnerProduct,
}

impl DistanceMetric {
    /// Normalize a raw distance value to `[0, 1]`, higher is better.
    #[must_use]
    pub fn normalize(self, distance: f32) -> f32 {
        match self {
            Self::Cosine => (1.0 - distance).clamp(0.0, 1.0),
            Self::L2 => 1.0 / (1.0 + distance),
            Self::InnerProduct => (-distance).max(0.0),
        }
    }

    #[must_use]
    pub fn pg_operator(self) -> &'static str {
        match self {
            Self::Cosine => "<=>",
            Self::L2 => "<->",
            Self::InnerProduct => "<#>",
        }
    }
}

/// Per-query max-normalization for keyword search: divide every raw score
/// by the top score in the batch. An empty input yields an empty output;
/// a top score of zero (or negative) is floored at 1.0 to avoid division
/// by zero, never merely because the top score is below 1.0.
#[must_use]
pub fn normalize_keyword_scores(raw_scores: &[f32]) -> Vec<f32> {
    let Some(&max) = raw_scores
        .iter()
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    else {
        return Vec::new();
    };
    let divisor = if max <= 0.0 { 1.0 } else { max };
    raw_scores.iter().map(|s| s / divisor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_normalization_matches_formula() {
        assert!((DistanceMetric::Cosine.normalize(0.0) - 1.0).abs() < 1e-6);
        assert!((DistanceMetric::Cosine.normalize(1.0) - 0.0).abs() < 1e-6);
        // distances > 1 clamp to 0 rather than going negative
        assert_eq!(DistanceMetric::Cosine.normalize(1.5), 0.0);
    }

    #[test]
    fn l2_normalization_is_bounded() {
        assert!((DistanceMetric::L2.normalize(0.0) - 1.0).abs() < 1e-6);
        assert!(DistanceMetric::L2.normalize(100.0) < 0.02);
    }

    #[test]
    fn inner_product_normalization_floors_at_zero() {
        assert_eq!(DistanceMetric::InnerProduct.normalize(5.0), 0.0);
        assert!((DistanceMetric::InnerProduct.normalize(-5.0) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn keyword_normalization_divides_by_max() {
        let scores = normalize_keyword_scores(&[4.0, 2.0, 1.0]);
        assert_eq!(scores, vec![1.0, 0.5, 0.25]);
    }

    #[test]
    fn keyword_normalization_of_empty_input_is_empty() {
        assert!(normalize_keyword_scores(&[]).is_empty());
    }

    #[test]
    fn keyword_normalization_scales_up_when_max_is_below_one() {
        let scores = normalize_keyword_scores(&[0.5, 0.25]);
        assert_eq!(scores, vec![1.0, 0.5]);
    }

    #[test]
    fn keyword_normalization_floors_divisor_only_at_zero_or_below() {
        let scores = normalize_keyword_scores(&[0.0, 0.0]);
        assert_eq!(scores, vec![0.0, 0.0]);
    }
}
