//! Temporal alignment of frames and transcript segments.
//!
//! Frames are sampled at fixed intervals; transcript segments end at
//! irregular utterance boundaries. Both are bucketed into fixed-width
//! time windows (default 30 s) and joined by window key. A transcript
//! spanning a window boundary is assigned only to the window containing
//! its start time: a segment starting at 29 s and ending at 35 s is
//! visible to frames in the 0-30 bucket and never to frames in 30-60.
//! That asymmetry is deliberate and relied on elsewhere; widening the
//! join to overlap-based matching would change result sets.

use std::collections::HashMap;
use std::sync::Arc;

use itertools::Itertools;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::evidence::{DocId, FrameDoc, TranscriptDoc};

/// Default bucket width in seconds.
pub const DEFAULT_WINDOW_SECS: f64 = 30.0;

/// Compute the window key for a timestamp: `floor(ts / width)`.
/// Two documents are temporally co-located iff their keys are equal.
#[must_use]
pub fn window_key(ts: f64, width: f64) -> i64 {
    debug_assert!(width > 0.0);
    (ts / width).floor() as i64
}

/// Human-readable `"start-end"` label for a bucket, e.g. `"30-60"`.
#[must_use]
pub fn window_label(key: i64, width: f64) -> String {
    let start = key as f64 * width;
    let end = start + width;
    format!("{}-{}", start as i64, end as i64)
}

/// Immutable lookup from a frame's window key to the transcript ids
/// whose start time falls in the same window.
///
/// Built once per video (or per refresh) and shared read-only between
/// concurrent queries. Rebuilds produce a fresh index which is swapped
/// in whole via [`SharedTemporalIndex`].
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalIndex {
    width: f64,
    buckets: HashMap<i64, Vec<DocId>>,
}

impl TemporalIndex {
    /// Group transcript ids by the window key of their start time.
    ///
    /// Grouping is a pure function of start times and width, so building
    /// twice from identical input yields identical lookup results.
    /// Within a bucket, ids are sorted so the grouping does not depend
    /// on input order.
    #[must_use]
    pub fn build<'a, I>(transcripts: I, width: f64) -> Self
    where
        I: IntoIterator<Item = (&'a DocId, &'a TranscriptDoc)>,
    {
        Self::build_from_starts(
            transcripts.into_iter().map(|(id, t)| (id.clone(), t.t_start)),
            width,
        )
    }

    /// Build from `(id, start_time)` pairs directly.
    #[must_use]
    pub fn build_from_starts<I>(starts: I, width: f64) -> Self
    where
        I: IntoIterator<Item = (DocId, f64)>,
    {
        let mut buckets: HashMap<i64, Vec<DocId>> = starts
            .into_iter()
            .map(|(id, start)| (window_key(start, width), id))
            .into_group_map();
        for ids in buckets.values_mut() {
            ids.sort_unstable();
        }
        Self { width, buckets }
    }

    /// An index with no transcripts. Every lookup is empty.
    #[must_use]
    pub fn empty(width: f64) -> Self {
        Self {
            width,
            buckets: HashMap::new(),
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Transcript ids in the frame's window. Empty when no transcript
    /// starts in that window.
    #[must_use]
    pub fn lookup(&self, frame_ts: f64) -> &[DocId] {
        self.buckets
            .get(&window_key(frame_ts, self.width))
            .map_or(&[], Vec::as_slice)
    }

    /// Like [`lookup`](Self::lookup), but with adjacent-bucket tolerance:
    /// also returns transcripts starting in the windows directly before
    /// and after the frame's window.
    #[must_use]
    pub fn lookup_with_tolerance(&self, frame_ts: f64) -> Vec<DocId> {
        let key = window_key(frame_ts, self.width);
        [key - 1, key, key + 1]
            .iter()
            .filter_map(|k| self.buckets.get(k))
            .flatten()
            .cloned()
            .collect()
    }

    /// Number of non-empty buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Shared handle to the current temporal index.
///
/// Queries clone the inner `Arc` and read without holding the lock;
/// a rebuild constructs a complete new index and swaps the reference,
/// so readers never observe a partially built index.
#[derive(Debug)]
pub struct SharedTemporalIndex {
    inner: RwLock<Arc<TemporalIndex>>,
}

impl SharedTemporalIndex {
    #[must_use]
    pub fn new(index: TemporalIndex) -> Self {
        Self {
            inner: RwLock::new(Arc::new(index)),
        }
    }

    /// Snapshot of the current index.
    #[must_use]
    pub fn load(&self) -> Arc<TemporalIndex> {
        Arc::clone(&self.inner.read())
    }

    /// Atomically replace the index. In-flight readers keep their
    /// snapshot until they drop it.
    pub fn swap(&self, index: TemporalIndex) {
        *self.inner.write() = Arc::new(index);
    }
}

impl Default for SharedTemporalIndex {
    fn default() -> Self {
        Self::new(TemporalIndex::empty(DEFAULT_WINDOW_SECS))
    }
}

/// Join output for one frame: the frame's fields plus references (ids
/// only, no payload duplication) to the transcripts in its window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedEvidenceRecord {
    pub frame_id: DocId,
    pub frame_number: u64,
    pub frame_timestamp: f64,
    pub frame_description: String,
    pub video_id: String,
    /// Ids of transcripts starting in this frame's window.
    pub transcript_ids: Vec<DocId>,
    /// `"start-end"` window label.
    pub time_range: String,
    pub transcript_count: usize,
}

/// Rebuild the full merged record set for a corpus.
///
/// Always a complete rebuild: records are computed from scratch and
/// returned as one batch for the caller to swap in, never patched
/// incrementally, because transcripts arriving out of order would
/// otherwise leave stale buckets behind.
#[must_use]
pub fn build_merged(
    frames: &[(DocId, FrameDoc)],
    transcripts: &[(DocId, TranscriptDoc)],
    width: f64,
) -> Vec<MergedEvidenceRecord> {
    let index = TemporalIndex::build(transcripts.iter().map(|(id, t)| (id, t)), width);

    frames
        .iter()
        .map(|(id, frame)| {
            let transcript_ids = index.lookup(frame.timestamp).to_vec();
            let transcript_count = transcript_ids.len();
            MergedEvidenceRecord {
                frame_id: id.clone(),
                frame_number: frame.frame_number,
                frame_timestamp: frame.timestamp,
                frame_description: frame.description.clone(),
                video_id: frame.video_id.clone(),
                transcript_ids,
                time_range: window_label(window_key(frame.timestamp, width), width),
                transcript_count,
            }
        })
        .collect()
}
