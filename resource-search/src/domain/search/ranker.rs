//! Cosine similarity scoring and deterministic ranking.
//!
//! Every candidate is scored independently against the query (full scan).
//! Candidates without a usable embedding score exactly 0.

use std::cmp::Ordering;

use tracing::debug;

use super::types::{DocumentRecord, RankedResult};

/// Cosine similarity between two vectors of equal length.
///
/// Returns `None` when the lengths differ. A zero-norm vector yields 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(0.0);
    }

    // A single root keeps parallel vectors at exactly 1.
    Some(dot / (norm_a * norm_b).sqrt())
}

/// Similarity of a candidate to the query.
///
/// Absent embeddings, dimension mismatches and non-finite results all land on
/// the 0 floor. Rounding is clamped so the result stays within [-1, 1].
pub fn score(query: &[f32], candidate: Option<&[f32]>) -> f64 {
    let Some(candidate) = candidate else {
        return 0.0;
    };

    match cosine_similarity(query, candidate) {
        Some(s) if s.is_finite() => normalize(s.clamp(-1.0, 1.0)),
        Some(_) => 0.0,
        None => 0.0,
    }
}

// -0.0 and 0.0 must rank identically.
fn normalize(s: f64) -> f64 {
    if s == 0.0 {
        0.0
    } else {
        s
    }
}

/// Descending by score, then ascending by document id.
pub fn compare(a: &RankedResult, b: &RankedResult) -> Ordering {
    b.similarity_score
        .total_cmp(&a.similarity_score)
        .then_with(|| a.document.id.cmp(&b.document.id))
}

/// Score every candidate and sort them into a total, reproducible order.
pub fn rank(query: &[f32], candidates: Vec<DocumentRecord>) -> Vec<RankedResult> {
    let mut ranked: Vec<RankedResult> = candidates
        .into_iter()
        .map(|document| {
            if let Some(embedding) = &document.embedding {
                if embedding.len() != query.len() {
                    debug!(
                        document_id = %document.id,
                        expected = query.len(),
                        actual = embedding.len(),
                        "Stored embedding dimension mismatch, scoring as absent"
                    );
                }
            }

            let similarity_score = score(query, document.embedding.as_deref());
            RankedResult {
                document,
                similarity_score,
            }
        })
        .collect();

    ranked.sort_by(compare);
    ranked
}
