//! Retrieval document model.
//!
//! Evidence comes in two shapes: sampled video frames with generated
//! descriptions, and spoken-transcript segments. Both carry an owning
//! video id and an optional embedding vector. The variants are explicit
//! so downstream code never probes for field presence.

use serde::{Deserialize, Serialize};

use crate::error::{ClipseekError, Result};

/// Stable, opaque document identity. Ordering is lexicographic on the
/// string form, which is what fusion tie-breaks use.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DocId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A sampled video frame with its generated description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDoc {
    /// Frame number, monotonic within a video.
    pub frame_number: u64,
    /// Frame timestamp in seconds from the start of the video.
    pub timestamp: f64,
    /// Generated description. Empty when the vision generator failed.
    #[serde(default)]
    pub description: String,
    /// Owning video.
    pub video_id: String,
    /// Embedding vector. None when embedding generation failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// One spoken-transcript segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptDoc {
    /// Segment start in seconds.
    pub t_start: f64,
    /// Segment end in seconds, >= t_start.
    pub t_end: f64,
    /// Spoken text.
    #[serde(default)]
    pub text: String,
    /// Owning video.
    pub video_id: String,
    /// Embedding vector. None when embedding generation failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// A retrieval document: one frame or one transcript segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    Frame(FrameDoc),
    Transcript(TranscriptDoc),
}

impl Evidence {
    /// Owning video id.
    #[must_use]
    pub fn video_id(&self) -> &str {
        match self {
            Self::Frame(f) => &f.video_id,
            Self::Transcript(t) => &t.video_id,
        }
    }

    /// The anchor timestamp used for temporal bucketing: the frame
    /// timestamp, or the transcript's start time.
    #[must_use]
    pub fn anchor_timestamp(&self) -> f64 {
        match self {
            Self::Frame(f) => f.timestamp,
            Self::Transcript(t) => t.t_start,
        }
    }

    /// Description or spoken text, depending on variant.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Frame(f) => &f.description,
            Self::Transcript(t) => &t.text,
        }
    }

    /// Embedding vector, if generation succeeded.
    #[must_use]
    pub fn embedding(&self) -> Option<&[f32]> {
        match self {
            Self::Frame(f) => f.embedding.as_deref(),
            Self::Transcript(t) => t.embedding.as_deref(),
        }
    }

    /// Check the document invariants: non-empty video id, non-negative
    /// timestamps, `t_end >= t_start` for transcript spans.
    pub fn validate(&self) -> Result<()> {
        if self.video_id().is_empty() {
            return Err(ClipseekError::InvalidDocument(
                "document has no owning video id".to_string(),
            ));
        }
        match self {
            Self::Frame(f) => {
                if !f.timestamp.is_finite() || f.timestamp < 0.0 {
                    return Err(ClipseekError::InvalidDocument(format!(
                        "frame {} has invalid timestamp {}",
                        f.frame_number, f.timestamp
                    )));
                }
            }
            Self::Transcript(t) => {
                if !t.t_start.is_finite() || t.t_start < 0.0 {
                    return Err(ClipseekError::InvalidDocument(format!(
                        "transcript has invalid start time {}",
                        t.t_start
                    )));
                }
                if !t.t_end.is_finite() || t.t_end < t.t_start {
                    return Err(ClipseekError::InvalidDocument(format!(
                        "transcript span end {} precedes start {}",
                        t.t_end, t.t_start
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(ts: f64) -> Evidence {
        Evidence::Frame(FrameDoc {
            frame_number: 1,
            timestamp: ts,
            description: "a player in a red shirt".to_string(),
            video_id: "vid-1".to_string(),
            embedding: None,
        })
    }

    #[test]
    fn doc_id_orders_lexicographically() {
        assert!(DocId::from("a") < DocId::from("b"));
        assert!(DocId::from("doc-10") < DocId::from("doc-9"));
    }

    #[test]
    fn valid_frame_passes() {
        assert!(frame(2.0).validate().is_ok());
        assert!(frame(0.0).validate().is_ok());
    }

    #[test]
    fn negative_timestamp_rejected() {
        assert!(frame(-1.0).validate().is_err());
        assert!(frame(f64::NAN).validate().is_err());
    }

    #[test]
    fn inverted_transcript_span_rejected() {
        let t = Evidence::Transcript(TranscriptDoc {
            t_start: 10.0,
            t_end: 5.0,
            text: "hello".to_string(),
            video_id: "vid-1".to_string(),
            embedding: None,
        });
        assert!(t.validate().is_err());
    }

    #[test]
    fn missing_video_id_rejected() {
        let t = Evidence::Transcript(TranscriptDoc {
            t_start: 0.0,
            t_end: 1.0,
            text: "hello".to_string(),
            video_id: String::new(),
            embedding: None,
        });
        assert!(t.validate().is_err());
    }

    #[test]
    fn serde_tagged_roundtrip() {
        let e = frame(4.0);
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"kind\":\"frame\""));
        let back: Evidence = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn anchor_timestamp_per_variant() {
        assert_eq!(frame(45.0).anchor_timestamp(), 45.0);
        let t = Evidence::Transcript(TranscriptDoc {
            t_start: 31.0,
            t_end: 35.0,
            text: String::new(),
            video_id: "vid-1".to_string(),
            embedding: None,
        });
        assert_eq!(t.anchor_timestamp(), 31.0);
    }
}
