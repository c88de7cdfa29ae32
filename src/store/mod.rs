//! Evidence store interface.
//!
//! The storage engine is an external collaborator with exactly two
//! query capabilities: vector nearest-neighbor search and full-text
//! search, both returning engine-native descending relevance order.
//! [`MemoryStore`] is the in-process reference implementation.

pub mod memory;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClipseekError, Result};
use crate::evidence::{DocId, Evidence};

pub use memory::MemoryStore;

/// One hit from a storage-engine query, in engine-native order.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub doc_id: DocId,
    /// Engine-native relevance score (cosine similarity, BM25, ...).
    pub score: f64,
    pub evidence: Evidence,
}

/// Text search flavor: loose keyword match or exact phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSearchMode {
    #[default]
    Text,
    Phrase,
}

/// Query interface the fusion core needs from a storage engine.
///
/// Implementations are expected to be cheap to share (`Arc`) and safe
/// to query concurrently.
pub trait EvidenceStore: Send + Sync {
    /// Nearest-neighbor search over document embeddings.
    fn vector_search(
        &self,
        collection: &str,
        query: &[f32],
        num_candidates: usize,
        limit: usize,
    ) -> Result<Vec<SearchHit>>;

    /// Full-text relevance search over document text.
    fn text_search(
        &self,
        collection: &str,
        query: &str,
        mode: TextSearchMode,
        limit: usize,
    ) -> Result<Vec<SearchHit>>;
}

/// Administrative probe surface: is a named search index queryable yet?
pub trait IndexAdmin: Send + Sync {
    fn index_ready(&self, index: &str) -> Result<bool>;
}

/// Wait until a search index is queryable, or time out.
///
/// Probes with exponential backoff starting at 100 ms, capped at 5 s.
/// Probe errors are treated as "not ready yet" and retried until the
/// deadline.
pub async fn await_index_ready(
    admin: &dyn IndexAdmin,
    index: &str,
    timeout: Duration,
) -> Result<()> {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut backoff = Duration::from_millis(100);

    loop {
        match admin.index_ready(index) {
            Ok(true) => return Ok(()),
            Ok(false) => debug!(index, "index not queryable yet"),
            Err(err) => debug!(index, %err, "index readiness probe failed"),
        }

        if tokio::time::Instant::now() + backoff > deadline {
            return Err(ClipseekError::IndexNotReady(format!(
                "index {index} not queryable within {timeout:?}"
            )));
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(Duration::from_secs(5));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyAdmin {
        probes_until_ready: usize,
        probes: AtomicUsize,
    }

    impl IndexAdmin for FlakyAdmin {
        fn index_ready(&self, _index: &str) -> Result<bool> {
            let n = self.probes.fetch_add(1, Ordering::SeqCst);
            Ok(n + 1 >= self.probes_until_ready)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ready_after_backoff() {
        let admin = FlakyAdmin {
            probes_until_ready: 3,
            probes: AtomicUsize::new(0),
        };
        await_index_ready(&admin, "vector_search_index_scalar", Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(admin.probes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn never_ready_times_out() {
        struct NeverReady;
        impl IndexAdmin for NeverReady {
            fn index_ready(&self, _index: &str) -> Result<bool> {
                Ok(false)
            }
        }

        let err = await_index_ready(&NeverReady, "missing_index", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ClipseekError::IndexNotReady(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn probe_errors_are_retried() {
        struct ErrThenReady {
            probes: AtomicUsize,
        }
        impl IndexAdmin for ErrThenReady {
            fn index_ready(&self, _index: &str) -> Result<bool> {
                if self.probes.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ClipseekError::Storage("listSearchIndexes failed".into()))
                } else {
                    Ok(true)
                }
            }
        }

        let admin = ErrThenReady {
            probes: AtomicUsize::new(0),
        };
        await_index_ready(&admin, "idx", Duration::from_secs(10))
            .await
            .unwrap();
    }
}
