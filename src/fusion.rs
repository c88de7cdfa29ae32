//! Reciprocal Rank Fusion over named retrieval pipelines.
//!
//! Each pipeline contributes one ranked list. A document at 1-based
//! rank `r` in a pipeline with weight `w` contributes `w / (k + r)` to
//! its fused score, with `k = 60`. Documents are merged by the string
//! form of their id, so the same logical document surfaced by several
//! pipelines accumulates into one candidate.
//!
//! Fusion is deterministic: pipelines are processed in declared order
//! (never completion order), the representative payload is taken from
//! the first pipeline to contribute, and equal scores tie-break on
//! ascending document id.

use std::collections::HashMap;

use serde::Serialize;

use crate::evidence::{DocId, Evidence};

/// RRF smoothing constant from the Cormack/Clarke/Buettcher paper.
///
/// Fixed on purpose: changing k changes what a fused score means, not
/// just its scale, so it is not exposed through configuration. At rank 1
/// the unweighted contribution is 1/61 and later ranks decay smoothly.
pub const RRF_K: f64 = 60.0;

/// One ranked result list, as returned by a single pipeline.
#[derive(Debug, Clone)]
pub struct PipelineRanking {
    /// Declared pipeline name, e.g. `"frameVector"`.
    pub pipeline: String,
    /// Hits in engine-native descending relevance order. Rank is the
    /// 1-based position in this list.
    pub hits: Vec<RankedHit>,
}

/// One document in a pipeline's ranking.
#[derive(Debug, Clone)]
pub struct RankedHit {
    pub doc_id: DocId,
    /// The engine's own relevance score, kept for audit only. RRF uses
    /// rank, never this value.
    pub raw_score: f64,
    pub evidence: Evidence,
}

/// Audit record: what one pipeline added to one candidate's score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub pipeline: String,
    /// 1-based rank within the pipeline.
    pub rank: usize,
    pub weight: f64,
    /// `weight / (RRF_K + rank)`.
    pub contribution: f64,
    /// The pipeline's native relevance score.
    pub raw_score: f64,
}

/// A fused, deduplicated result.
#[derive(Debug, Clone)]
pub struct FusionResult {
    pub doc_id: DocId,
    /// Accumulated RRF score across all contributing pipelines.
    pub score: f64,
    /// Representative payload: from the first pipeline that surfaced
    /// this document.
    pub evidence: Evidence,
    /// Per-pipeline score provenance, in pipeline declaration order.
    pub contributions: Vec<Contribution>,
    /// For frame candidates: transcript ids temporally co-located with
    /// the frame. Attached after fusion, never scored.
    pub transcript_refs: Vec<DocId>,
}

/// Working accumulator for one document id during a single fuse call.
struct FusionCandidate {
    score: f64,
    evidence: Evidence,
    contributions: Vec<Contribution>,
}

/// Merge pipeline rankings into one globally ordered list.
///
/// `weights` maps pipeline name to a non-negative weight; a pipeline
/// with no entry gets weight 1.0. Weights are applied as given — the
/// engine never normalizes them. Empty rankings contribute nothing,
/// and an entirely empty input produces an empty output: "no evidence"
/// is a valid outcome, not an error.
#[must_use]
pub fn fuse(
    rankings: &[PipelineRanking],
    weights: &HashMap<String, f64>,
    top_n: usize,
) -> Vec<FusionResult> {
    let mut candidates: HashMap<DocId, FusionCandidate> = HashMap::new();

    for ranking in rankings {
        let weight = weights.get(&ranking.pipeline).copied().unwrap_or(1.0);
        for (idx, hit) in ranking.hits.iter().enumerate() {
            let rank = idx + 1;
            let contribution = weight * (1.0 / (RRF_K + rank as f64));
            let record = Contribution {
                pipeline: ranking.pipeline.clone(),
                rank,
                weight,
                contribution,
                raw_score: hit.raw_score,
            };

            candidates
                .entry(hit.doc_id.clone())
                .and_modify(|c| {
                    c.score += contribution;
                    c.contributions.push(record.clone());
                })
                .or_insert_with(|| FusionCandidate {
                    score: contribution,
                    evidence: hit.evidence.clone(),
                    contributions: vec![record],
                });
        }
    }

    let mut results: Vec<FusionResult> = candidates
        .into_iter()
        .map(|(doc_id, c)| FusionResult {
            doc_id,
            score: c.score,
            evidence: c.evidence,
            contributions: c.contributions,
            transcript_refs: Vec::new(),
        })
        .collect();

    // Score descending; equal scores fall back to ascending doc id so
    // repeated runs order ties identically.
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    results.truncate(top_n);
    results
}
