//! Corpus ingestion: turn extracted video frames and transcript
//! segments into evidence documents with embeddings attached.
//!
//! Frame timestamps are recovered from the extractor's filename
//! convention (`frame_0001_t2.0s.jpg`); files that predate the
//! convention fall back to `index * 2.0`, the extractor's fixed
//! sampling interval.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::embed::{EmbedInput, EmbedMode, Embedder};
use crate::error::{ClipseekError, Result};
use crate::evidence::{DocId, Evidence, FrameDoc, TranscriptDoc};
use crate::store::memory::MemoryStore;

/// Produces a textual description for a frame image. The production
/// backend is a vision model; tests substitute a canned one.
pub trait FrameDescriber: Send + Sync {
    fn describe(&self, image: &[u8]) -> Result<String>;
}

/// Produces transcript segments for an audio track.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, audio: &[u8]) -> Result<Vec<TranscriptSegment>>;
}

/// One raw transcript segment before it becomes evidence.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptSegment {
    pub t_start: f64,
    pub t_end: f64,
    pub text: String,
}

/// What one ingest run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub ingested: usize,
    pub skipped: usize,
}

/// Seconds between sampled frames when the filename carries no
/// explicit timestamp.
const FALLBACK_FRAME_INTERVAL: f64 = 2.0;

/// Parse `(frame_number, timestamp)` out of a frame filename shaped
/// like `frame_0001_t2.0s.jpg`. `index` is the file's position in the
/// scan, used for the fallback timestamp.
#[must_use]
pub fn parse_frame_timestamp(file_name: &str, index: usize) -> (u64, f64) {
    let fallback = (index as u64, index as f64 * FALLBACK_FRAME_INTERVAL);
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => file_name,
    };
    let Some(rest) = stem.strip_prefix("frame_") else {
        return fallback;
    };
    let Some((number_part, ts_part)) = rest.split_once("_t") else {
        return fallback;
    };
    let Some(secs) = ts_part.strip_suffix('s') else {
        return fallback;
    };
    match (number_part.parse::<u64>(), secs.parse::<f64>()) {
        (Ok(number), Ok(ts)) if ts.is_finite() && ts >= 0.0 => (number, ts),
        _ => fallback,
    }
}

/// Sidecar JSON record for pre-described frames, as written by the
/// extraction step.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameRecord {
    pub file_name: String,
    pub description: String,
}

pub struct Ingester {
    store: Arc<MemoryStore>,
    embedder: Arc<dyn Embedder>,
}

impl Ingester {
    #[must_use]
    pub fn new(store: Arc<MemoryStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Ingest frame images from a directory, describing each one.
    ///
    /// Files the describer or embedder reject are skipped, not fatal:
    /// a corpus with holes still answers queries.
    pub fn ingest_frame_dir(
        &self,
        dir: &Path,
        video_id: &str,
        describer: &dyn FrameDescriber,
    ) -> Result<IngestReport> {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| matches!(e, "jpg" | "jpeg" | "png"))
            })
            .collect();
        files.sort();

        let mut report = IngestReport::default();
        for (index, path) in files.iter().enumerate() {
            match self.ingest_one_frame(path, index, video_id, describer) {
                Ok(()) => report.ingested += 1,
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping frame");
                    report.skipped += 1;
                }
            }
        }
        self.store.commit()?;
        info!(
            video_id,
            ingested = report.ingested,
            skipped = report.skipped,
            "frame ingest finished"
        );
        Ok(report)
    }

    fn ingest_one_frame(
        &self,
        path: &Path,
        index: usize,
        video_id: &str,
        describer: &dyn FrameDescriber,
    ) -> Result<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ClipseekError::InvalidDocument(format!(
                    "non-utf8 file name: {}",
                    path.display()
                ))
            })?;
        let (frame_number, timestamp) = parse_frame_timestamp(file_name, index);
        let image = std::fs::read(path)?;
        let description = describer.describe(&image)?;
        let embedding = self
            .embedder
            .embed(EmbedInput::Text(&description), EmbedMode::Document)?;
        debug!(file_name, frame_number, timestamp, "frame described");

        let frame = FrameDoc {
            frame_number,
            timestamp,
            description,
            video_id: video_id.to_string(),
            embedding: Some(embedding),
        };
        self.store.insert(
            &self.store.storage_config().frames_collection,
            DocId::from(Uuid::new_v4().to_string()),
            Evidence::Frame(frame),
        )
    }

    /// Ingest frames whose descriptions were produced ahead of time
    /// and stored alongside the images.
    pub fn ingest_frame_records(
        &self,
        records: &[FrameRecord],
        video_id: &str,
    ) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        for (index, record) in records.iter().enumerate() {
            let (frame_number, timestamp) = parse_frame_timestamp(&record.file_name, index);
            let embedding = match self
                .embedder
                .embed(EmbedInput::Text(&record.description), EmbedMode::Document)
            {
                Ok(v) => v,
                Err(err) => {
                    warn!(file_name = %record.file_name, %err, "skipping frame record");
                    report.skipped += 1;
                    continue;
                }
            };
            let frame = FrameDoc {
                frame_number,
                timestamp,
                description: record.description.clone(),
                video_id: video_id.to_string(),
                embedding: Some(embedding),
            };
            match self.store.insert(
                &self.store.storage_config().frames_collection,
                DocId::from(Uuid::new_v4().to_string()),
                Evidence::Frame(frame),
            ) {
                Ok(()) => report.ingested += 1,
                Err(err) => {
                    warn!(file_name = %record.file_name, %err, "skipping frame record");
                    report.skipped += 1;
                }
            }
        }
        self.store.commit()?;
        Ok(report)
    }

    /// Transcribe an audio track and ingest the resulting segments.
    pub fn ingest_audio(
        &self,
        audio: &[u8],
        video_id: &str,
        transcriber: &dyn Transcriber,
    ) -> Result<(IngestReport, Vec<(DocId, TranscriptDoc)>)> {
        let segments = transcriber.transcribe(audio)?;
        self.ingest_transcripts(&segments, video_id)
    }

    /// Ingest transcript segments and return the `(id, doc)` pairs so
    /// the caller can install them into the temporal join as well.
    pub fn ingest_transcripts(
        &self,
        segments: &[TranscriptSegment],
        video_id: &str,
    ) -> Result<(IngestReport, Vec<(DocId, TranscriptDoc)>)> {
        let collection = self.store.storage_config().transcripts_collection.clone();
        let mut report = IngestReport::default();
        let mut installed = Vec::with_capacity(segments.len());
        for segment in segments {
            let embedding = match self
                .embedder
                .embed(EmbedInput::Text(&segment.text), EmbedMode::Document)
            {
                Ok(v) => v,
                Err(err) => {
                    warn!(t_start = segment.t_start, %err, "skipping transcript segment");
                    report.skipped += 1;
                    continue;
                }
            };
            let doc = TranscriptDoc {
                t_start: segment.t_start,
                t_end: segment.t_end,
                text: segment.text.clone(),
                video_id: video_id.to_string(),
                embedding: Some(embedding),
            };
            let id = DocId::from(Uuid::new_v4().to_string());
            match self
                .store
                .insert(&collection, id.clone(), Evidence::Transcript(doc.clone()))
            {
                Ok(()) => {
                    report.ingested += 1;
                    installed.push((id, doc));
                }
                Err(err) => {
                    warn!(t_start = segment.t_start, %err, "skipping transcript segment");
                    report.skipped += 1;
                }
            }
        }
        self.store.commit()?;
        info!(
            video_id,
            ingested = report.ingested,
            skipped = report.skipped,
            "transcript ingest finished"
        );
        Ok((report, installed))
    }
}

/// Load frame records from a sidecar JSON file, either a bare array
/// or a `{ "frames": [...] }` object.
pub fn load_frame_records(path: &Path) -> Result<Vec<FrameRecord>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FileShape {
        Bare(Vec<FrameRecord>),
        Wrapped { frames: Vec<FrameRecord> },
    }
    let raw = std::fs::read_to_string(path)?;
    match serde_json::from_str::<FileShape>(&raw)? {
        FileShape::Bare(records) | FileShape::Wrapped { frames: records } => Ok(records),
    }
}

/// Load transcript segments from a JSON file, either a bare array or
/// a `{ "segments": [...] }` object.
pub fn load_transcript_segments(path: &Path) -> Result<Vec<TranscriptSegment>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FileShape {
        Bare(Vec<TranscriptSegment>),
        Wrapped { segments: Vec<TranscriptSegment> },
    }
    let raw = std::fs::read_to_string(path)?;
    match serde_json::from_str::<FileShape>(&raw)? {
        FileShape::Bare(segments) | FileShape::Wrapped { segments } => Ok(segments),
    }
}
