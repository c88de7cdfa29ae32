//! Projection of fused results into the caller-facing shape.
//!
//! Internal bookkeeping (per-pipeline ranks, raw engine scores) is
//! dropped here; what remains is stable across both evidence variants.

use serde::{Deserialize, Serialize};

use crate::evidence::{DocId, Evidence};
use crate::fusion::{Contribution, FusionResult};

/// The public result record.
///
/// `text` is the frame description for frame-origin results and the
/// spoken text for transcript-origin results; a missing description is
/// an empty string, never absent, so consumers see one stable shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicResult {
    pub text: String,
    /// Frame timestamp, or transcript start time, in seconds.
    pub timestamp: f64,
    pub video_id: String,
    /// Fused RRF score.
    pub score: f64,
    /// Temporally co-located transcript ids (frame results only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transcript_refs: Vec<DocId>,
}

/// Diagnostic view of one result with its score provenance, used by
/// verbose CLI output. Not part of the stable public shape.
#[derive(Debug, Clone, Serialize)]
pub struct ExplainedResult {
    #[serde(flatten)]
    pub result: PublicResult,
    pub doc_id: DocId,
    pub contributions: Vec<Contribution>,
}

/// Project one fused result. Pure and total: never fails.
#[must_use]
pub fn project_one(fused: &FusionResult) -> PublicResult {
    let (text, timestamp, video_id) = match &fused.evidence {
        Evidence::Frame(f) => (f.description.clone(), f.timestamp, f.video_id.clone()),
        Evidence::Transcript(t) => (t.text.clone(), t.t_start, t.video_id.clone()),
    };
    PublicResult {
        text,
        timestamp,
        video_id,
        score: fused.score,
        transcript_refs: fused.transcript_refs.clone(),
    }
}

/// Project a fused ranking, preserving order.
#[must_use]
pub fn project(fused: &[FusionResult]) -> Vec<PublicResult> {
    fused.iter().map(project_one).collect()
}

/// Project with score provenance attached.
#[must_use]
pub fn explain(fused: &[FusionResult]) -> Vec<ExplainedResult> {
    fused
        .iter()
        .map(|f| ExplainedResult {
            result: project_one(f),
            doc_id: f.doc_id.clone(),
            contributions: f.contributions.clone(),
        })
        .collect()
}
