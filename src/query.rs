//! Query orchestration.
//!
//! One coordinating task per query: obtain the query embedding, fan
//! out one task per configured pipeline, then fuse, join transcript
//! references, and project. Pipelines run concurrently but the merge
//! consumes them in declared order, so the final ranking is identical
//! across runs whatever the completion timing.
//!
//! Failure policy: embedding is the only hard dependency — without a
//! query vector the requested weighting cannot be honored, so the
//! query fails rather than silently degrading to text-only. Storage
//! pipelines that fail or time out degrade to empty rankings with a
//! warning, and fusion proceeds on partial evidence.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::align::{SharedTemporalIndex, TemporalIndex};
use crate::config::Config;
use crate::embed::{EmbedInput, EmbedMode, Embedder};
use crate::error::{ClipseekError, Result};
use crate::evidence::{DocId, Evidence, TranscriptDoc};
use crate::fusion::{self, PipelineRanking, RankedHit};
use crate::project::{self, PublicResult};
use crate::store::{EvidenceStore, TextSearchMode};

/// Which storage primitive a pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Vector,
    Text,
}

/// One configured retrieval pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSpec {
    pub name: String,
    pub kind: PipelineKind,
    pub collection: String,
    /// Per-pipeline result cap.
    pub limit: usize,
    /// Vector candidate pool (ignored for text pipelines).
    pub num_candidates: usize,
    pub timeout: Duration,
}

/// The standard three-pipeline setup: frame vectors, frame text,
/// transcript vectors.
#[must_use]
pub fn standard_pipelines(config: &Config) -> Vec<PipelineSpec> {
    let search = &config.search;
    let storage = &config.storage;
    let base = |name: &str, kind, collection: &str| PipelineSpec {
        name: name.to_string(),
        kind,
        collection: collection.to_string(),
        limit: search.limit,
        num_candidates: search.num_candidates,
        timeout: search.pipeline_timeout,
    };
    vec![
        base("frameVector", PipelineKind::Vector, &storage.frames_collection),
        base("frameText", PipelineKind::Text, &storage.frames_collection),
        base(
            "transcriptVector",
            PipelineKind::Vector,
            &storage.transcripts_collection,
        ),
    ]
}

/// Default weights for [`standard_pipelines`].
#[must_use]
pub fn standard_weights(config: &Config) -> HashMap<String, f64> {
    HashMap::from([
        ("frameVector".to_string(), config.search.vector_weight),
        ("frameText".to_string(), config.search.text_weight),
        (
            "transcriptVector".to_string(),
            config.search.vector_weight,
        ),
    ])
}

/// A fusion request.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub query: String,
    /// Per-pipeline weights; a missing pipeline gets weight 1.0.
    pub weights: HashMap<String, f64>,
    pub top_n: usize,
    /// Overrides the temporal join width for this request.
    pub window_secs: Option<f64>,
    pub text_mode: TextSearchMode,
}

impl QueryRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            weights: HashMap::new(),
            top_n: 5,
            window_secs: None,
            text_mode: TextSearchMode::Text,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(ClipseekError::InvalidRequest("empty query".to_string()));
        }
        if self.top_n == 0 {
            return Err(ClipseekError::InvalidRequest(
                "top_n must be >= 1".to_string(),
            ));
        }
        for (name, weight) in &self.weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(ClipseekError::InvalidRequest(format!(
                    "weight for pipeline {name} must be a non-negative number"
                )));
            }
        }
        if let Some(width) = self.window_secs
            && (!width.is_finite() || width <= 0.0)
        {
            return Err(ClipseekError::InvalidRequest(
                "window_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// A fusion response. `warnings` names pipelines that failed, timed
/// out, or came back empty — the request itself still succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub results: Vec<PublicResult>,
    pub warnings: Vec<String>,
}

/// Query lifecycle phase. `Failed` is reachable only from `Embedding`;
/// fusion itself cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    Embedding,
    Fusing,
    Done,
    Failed,
}

/// Cancellation handle pair. The handle side cancels; the token side
/// is handed to [`QueryEngine::search`].
#[must_use]
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when cancelled; pends forever if the handle is dropped
    /// without cancelling.
    async fn cancelled(mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Outcome of one pipeline run: always a ranking (possibly empty),
/// plus a warning when the run degraded.
struct PipelineOutcome {
    ranking: PipelineRanking,
    warning: Option<String>,
}

/// Top-level retrieval engine.
pub struct QueryEngine {
    store: Arc<dyn EvidenceStore>,
    embedder: Arc<dyn Embedder>,
    pipelines: Vec<PipelineSpec>,
    aligner: SharedTemporalIndex,
    /// Transcript `(id, start)` pairs retained so a per-request window
    /// width can rebuild the join without touching the store.
    transcript_starts: RwLock<Arc<Vec<(DocId, f64)>>>,
    default_window: f64,
}

impl QueryEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn EvidenceStore>,
        embedder: Arc<dyn Embedder>,
        pipelines: Vec<PipelineSpec>,
        default_window: f64,
    ) -> Self {
        Self {
            store,
            embedder,
            pipelines,
            aligner: SharedTemporalIndex::new(TemporalIndex::empty(default_window)),
            transcript_starts: RwLock::new(Arc::new(Vec::new())),
            default_window,
        }
    }

    /// Install the transcript set used for temporal joins. Builds a
    /// fresh index at the default window width and swaps it in whole.
    pub fn install_transcripts(&self, transcripts: &[(DocId, TranscriptDoc)]) {
        let starts: Vec<(DocId, f64)> = transcripts
            .iter()
            .map(|(id, t)| (id.clone(), t.t_start))
            .collect();
        self.aligner.swap(TemporalIndex::build_from_starts(
            starts.iter().cloned(),
            self.default_window,
        ));
        *self.transcript_starts.write() = Arc::new(starts);
    }

    fn temporal_index(&self, window_secs: Option<f64>) -> Arc<TemporalIndex> {
        let current = self.aligner.load();
        match window_secs {
            None => current,
            Some(w) if (w - current.width()).abs() < f64::EPSILON => current,
            Some(w) => {
                let starts = Arc::clone(&self.transcript_starts.read());
                Arc::new(TemporalIndex::build_from_starts(
                    starts.iter().cloned(),
                    w,
                ))
            }
        }
    }

    /// Run one query end to end.
    pub async fn search(
        &self,
        request: QueryRequest,
        cancel: Option<CancelToken>,
    ) -> Result<QueryResponse> {
        let (fused, warnings) = self.run(request, cancel).await?;
        Ok(QueryResponse {
            results: project::project(&fused),
            warnings,
        })
    }

    /// Like [`search`](Self::search), but keeping score provenance.
    pub async fn search_explained(
        &self,
        request: QueryRequest,
        cancel: Option<CancelToken>,
    ) -> Result<(Vec<project::ExplainedResult>, Vec<String>)> {
        let (fused, warnings) = self.run(request, cancel).await?;
        Ok((project::explain(&fused), warnings))
    }

    /// The shared query flow: embed, fan out, fuse, join transcripts.
    ///
    /// Cancellation aborts before the merge step: partial pipeline
    /// output is discarded, never returned.
    #[instrument(skip_all, fields(query = %request.query))]
    async fn run(
        &self,
        request: QueryRequest,
        cancel: Option<CancelToken>,
    ) -> Result<(Vec<fusion::FusionResult>, Vec<String>)> {
        request.validate()?;

        let needs_vector = self
            .pipelines
            .iter()
            .any(|p| p.kind == PipelineKind::Vector);

        // Embedding phase. The sole transition to Failed lives here.
        let mut phase = QueryPhase::Embedding;
        debug!(?phase, "query started");
        let query_vector = if needs_vector {
            match self.embed_query(&request.query).await {
                Ok(vector) => Some(Arc::new(vector)),
                Err(err) => {
                    phase = QueryPhase::Failed;
                    debug!(?phase, %err, "query embedding failed");
                    return Err(err);
                }
            }
        } else {
            None
        };

        if let Some(token) = &cancel
            && token.is_cancelled()
        {
            return Err(ClipseekError::Cancelled);
        }

        phase = QueryPhase::Fusing;
        debug!(?phase, pipelines = self.pipelines.len(), "fanning out");

        // One task per pipeline; handles are awaited in declared order.
        let handles: Vec<_> = self
            .pipelines
            .iter()
            .map(|spec| {
                let store = Arc::clone(&self.store);
                let spec = spec.clone();
                let vector = query_vector.clone();
                let query = request.query.clone();
                let mode = request.text_mode;
                tokio::spawn(run_pipeline(store, spec, vector, query, mode))
            })
            .collect();

        let outcomes = match cancel {
            Some(token) => {
                let gather = collect_outcomes(handles);
                tokio::pin!(gather);
                tokio::select! {
                    () = token.cancelled() => return Err(ClipseekError::Cancelled),
                    outcomes = &mut gather => outcomes,
                }
            }
            None => collect_outcomes(handles).await,
        };

        let mut warnings = Vec::new();
        let mut rankings = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            if let Some(warning) = outcome.warning {
                warn!(pipeline = %outcome.ranking.pipeline, "{warning}");
                warnings.push(warning);
            } else if outcome.ranking.hits.is_empty() {
                warnings.push(format!(
                    "pipeline {} returned no results",
                    outcome.ranking.pipeline
                ));
            }
            rankings.push(outcome.ranking);
        }

        let mut fused = fusion::fuse(&rankings, &request.weights, request.top_n);

        // Attach temporally co-located transcript ids to frame
        // candidates. They annotate, never score.
        let index = self.temporal_index(request.window_secs);
        for result in &mut fused {
            if let Evidence::Frame(frame) = &result.evidence {
                result.transcript_refs = index.lookup(frame.timestamp).to_vec();
            }
        }

        phase = QueryPhase::Done;
        debug!(?phase, results = fused.len(), "query finished");
        Ok((fused, warnings))
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let embedder = Arc::clone(&self.embedder);
        let query = query.to_string();
        tokio::task::spawn_blocking(move || {
            embedder.embed(EmbedInput::Text(&query), EmbedMode::Query)
        })
        .await
        .map_err(|err| ClipseekError::Embedding(format!("embedding task failed: {err}")))?
    }
}

async fn collect_outcomes(
    handles: Vec<tokio::task::JoinHandle<PipelineOutcome>>,
) -> Vec<PipelineOutcome> {
    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => outcomes.push(PipelineOutcome {
                ranking: PipelineRanking {
                    pipeline: "unknown".to_string(),
                    hits: Vec::new(),
                },
                warning: Some(format!("pipeline task aborted: {err}")),
            }),
        }
    }
    outcomes
}

/// Run one pipeline against the store, degrading every failure mode
/// (engine error, timeout, missing query vector) to an empty ranking
/// plus a warning. Timed-out pipelines are not retried: the backend is
/// already slow, and a mid-query retry doubles its load.
async fn run_pipeline(
    store: Arc<dyn EvidenceStore>,
    spec: PipelineSpec,
    vector: Option<Arc<Vec<f32>>>,
    query: String,
    mode: TextSearchMode,
) -> PipelineOutcome {
    let name = spec.name.clone();
    let empty = |warning: Option<String>| PipelineOutcome {
        ranking: PipelineRanking {
            pipeline: name.clone(),
            hits: Vec::new(),
        },
        warning,
    };

    let vector = match (spec.kind, vector) {
        (PipelineKind::Vector, None) => {
            return empty(Some(format!(
                "pipeline {name} skipped: no query vector available"
            )));
        }
        (PipelineKind::Vector, Some(v)) => Some(v),
        (PipelineKind::Text, _) => None,
    };

    let deadline = spec.timeout;
    let blocking = tokio::task::spawn_blocking(move || match spec.kind {
        PipelineKind::Vector => {
            let v = vector.as_deref().map_or(&[][..], Vec::as_slice);
            store.vector_search(&spec.collection, v, spec.num_candidates, spec.limit)
        }
        PipelineKind::Text => store.text_search(&spec.collection, &query, mode, spec.limit),
    });

    match tokio::time::timeout(deadline, blocking).await {
        Err(_) => empty(Some(format!(
            "pipeline {name} timed out after {deadline:?}"
        ))),
        Ok(Err(join_err)) => empty(Some(format!("pipeline {name} task failed: {join_err}"))),
        Ok(Ok(Err(store_err))) => empty(Some(format!("pipeline {name} failed: {store_err}"))),
        Ok(Ok(Ok(hits))) => PipelineOutcome {
            ranking: PipelineRanking {
                pipeline: name,
                hits: hits
                    .into_iter()
                    .map(|hit| RankedHit {
                        doc_id: hit.doc_id,
                        raw_score: hit.score,
                        evidence: hit.evidence,
                    })
                    .collect(),
            },
            warning: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbedder;
    use crate::error::Result;
    use crate::evidence::FrameDoc;
    use crate::store::SearchHit;

    /// Scripted store: fixed hits per (collection, kind), optional
    /// per-collection delay or failure.
    #[derive(Default)]
    struct ScriptedStore {
        vector_hits: HashMap<String, Vec<SearchHit>>,
        text_hits: HashMap<String, Vec<SearchHit>>,
        fail_collections: Vec<String>,
        delay: Option<(String, Duration)>,
    }

    impl EvidenceStore for ScriptedStore {
        fn vector_search(
            &self,
            collection: &str,
            _query: &[f32],
            _num_candidates: usize,
            limit: usize,
        ) -> Result<Vec<SearchHit>> {
            if self.fail_collections.iter().any(|c| c == collection) {
                return Err(ClipseekError::Storage("engine unreachable".to_string()));
            }
            if let Some((slow, delay)) = &self.delay
                && slow == collection
            {
                std::thread::sleep(*delay);
            }
            let mut hits = self.vector_hits.get(collection).cloned().unwrap_or_default();
            hits.truncate(limit);
            Ok(hits)
        }

        fn text_search(
            &self,
            collection: &str,
            _query: &str,
            _mode: TextSearchMode,
            limit: usize,
        ) -> Result<Vec<SearchHit>> {
            if self.fail_collections.iter().any(|c| c == collection) {
                return Err(ClipseekError::Storage("engine unreachable".to_string()));
            }
            let mut hits = self.text_hits.get(collection).cloned().unwrap_or_default();
            hits.truncate(limit);
            Ok(hits)
        }
    }

    struct FailingEmbedder;
    impl Embedder for FailingEmbedder {
        fn embed(&self, _input: EmbedInput<'_>, _mode: EmbedMode) -> Result<Vec<f32>> {
            Err(ClipseekError::Embedding("service down".to_string()))
        }
        fn dims(&self) -> usize {
            8
        }
    }

    fn hit(id: &str, score: f64, ts: f64) -> SearchHit {
        SearchHit {
            doc_id: DocId::from(id),
            score,
            evidence: Evidence::Frame(FrameDoc {
                frame_number: 0,
                timestamp: ts,
                description: format!("frame {id}"),
                video_id: "vid-1".to_string(),
                embedding: None,
            }),
        }
    }

    fn pipeline(name: &str, kind: PipelineKind, collection: &str) -> PipelineSpec {
        PipelineSpec {
            name: name.to_string(),
            kind,
            collection: collection.to_string(),
            limit: 20,
            num_candidates: 100,
            timeout: Duration::from_millis(200),
        }
    }

    fn engine(store: ScriptedStore, pipelines: Vec<PipelineSpec>) -> QueryEngine {
        QueryEngine::new(
            Arc::new(store),
            Arc::new(HashEmbedder::new(8)),
            pipelines,
            30.0,
        )
    }

    #[tokio::test]
    async fn embedding_failure_fails_the_query() {
        let engine = QueryEngine::new(
            Arc::new(ScriptedStore::default()),
            Arc::new(FailingEmbedder),
            vec![pipeline("frameVector", PipelineKind::Vector, "frames")],
            30.0,
        );
        let err = engine
            .search(QueryRequest::new("red shirt"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClipseekError::Embedding(_)));
    }

    #[tokio::test]
    async fn embedding_skipped_when_no_vector_pipelines() {
        // A failing embedder is irrelevant when only text pipelines
        // are configured.
        let mut store = ScriptedStore::default();
        store
            .text_hits
            .insert("frames".to_string(), vec![hit("fr-1", 2.0, 4.0)]);
        let engine = QueryEngine::new(
            Arc::new(store),
            Arc::new(FailingEmbedder),
            vec![pipeline("frameText", PipelineKind::Text, "frames")],
            30.0,
        );

        let response = engine
            .search(QueryRequest::new("red shirt"), None)
            .await
            .unwrap();
        assert_eq!(response.results.len(), 1);
    }

    #[tokio::test]
    async fn failed_pipeline_degrades_with_warning() {
        let mut store = ScriptedStore::default();
        store
            .vector_hits
            .insert("frames".to_string(), vec![hit("fr-1", 0.9, 2.0)]);
        store.fail_collections.push("transcripts".to_string());

        let engine = engine(
            store,
            vec![
                pipeline("frameVector", PipelineKind::Vector, "frames"),
                pipeline("transcriptVector", PipelineKind::Vector, "transcripts"),
            ],
        );

        let response = engine
            .search(QueryRequest::new("red shirt"), None)
            .await
            .unwrap();
        assert_eq!(response.results.len(), 1);
        assert!(
            response
                .warnings
                .iter()
                .any(|w| w.contains("transcriptVector") && w.contains("failed"))
        );
    }

    #[tokio::test]
    async fn timed_out_pipeline_equals_empty_plus_warning() {
        let mut store = ScriptedStore::default();
        store
            .vector_hits
            .insert("frames".to_string(), vec![hit("fr-1", 0.9, 2.0)]);
        store
            .vector_hits
            .insert("transcripts".to_string(), vec![hit("tr-1", 0.8, 3.0)]);
        store.delay = Some(("transcripts".to_string(), Duration::from_secs(5)));

        let engine = engine(
            store,
            vec![
                pipeline("frameVector", PipelineKind::Vector, "frames"),
                pipeline("transcriptVector", PipelineKind::Vector, "transcripts"),
            ],
        );

        let response = engine
            .search(QueryRequest::new("red shirt"), None)
            .await
            .unwrap();

        // Only the fast pipeline contributed.
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].text, "frame fr-1");
        assert!(
            response
                .warnings
                .iter()
                .any(|w| w.contains("transcriptVector") && w.contains("timed out"))
        );
    }

    #[tokio::test]
    async fn all_pipelines_empty_is_no_evidence_not_error() {
        let engine = engine(
            ScriptedStore::default(),
            vec![pipeline("frameVector", PipelineKind::Vector, "frames")],
        );
        let response = engine
            .search(QueryRequest::new("something obscure"), None)
            .await
            .unwrap();
        assert!(response.results.is_empty());
        assert!(
            response
                .warnings
                .iter()
                .any(|w| w.contains("returned no results"))
        );
    }

    #[tokio::test]
    async fn cancellation_discards_partial_work() {
        let mut store = ScriptedStore::default();
        store
            .vector_hits
            .insert("frames".to_string(), vec![hit("fr-1", 0.9, 2.0)]);
        store.delay = Some(("frames".to_string(), Duration::from_millis(100)));

        let mut spec = pipeline("frameVector", PipelineKind::Vector, "frames");
        spec.timeout = Duration::from_secs(5);
        let engine = engine(store, vec![spec]);

        let (handle, token) = cancel_pair();
        handle.cancel();

        let err = engine
            .search(QueryRequest::new("red shirt"), Some(token))
            .await
            .unwrap_err();
        assert!(matches!(err, ClipseekError::Cancelled));
    }

    #[tokio::test]
    async fn frame_results_carry_transcript_refs() {
        let mut store = ScriptedStore::default();
        store
            .vector_hits
            .insert("frames".to_string(), vec![hit("fr-1", 0.9, 45.0)]);
        let engine = engine(
            store,
            vec![pipeline("frameVector", PipelineKind::Vector, "frames")],
        );

        engine.install_transcripts(&[(
            DocId::from("tr-1"),
            TranscriptDoc {
                t_start: 31.0,
                t_end: 35.0,
                text: "spoken".to_string(),
                video_id: "vid-1".to_string(),
                embedding: None,
            },
        )]);

        let response = engine
            .search(QueryRequest::new("red shirt"), None)
            .await
            .unwrap();
        assert_eq!(response.results[0].transcript_refs, vec![DocId::from("tr-1")]);
    }

    #[tokio::test]
    async fn request_window_override_rebuilds_join() {
        let mut store = ScriptedStore::default();
        store
            .vector_hits
            .insert("frames".to_string(), vec![hit("fr-1", 0.9, 45.0)]);
        let engine = engine(
            store,
            vec![pipeline("frameVector", PipelineKind::Vector, "frames")],
        );
        engine.install_transcripts(&[(
            DocId::from("tr-1"),
            TranscriptDoc {
                t_start: 31.0,
                t_end: 35.0,
                text: "spoken".to_string(),
                video_id: "vid-1".to_string(),
                embedding: None,
            },
        )]);

        // With a 10 s window, frame at 45 s (bucket 4) no longer joins
        // the transcript starting at 31 s (bucket 3).
        let mut request = QueryRequest::new("red shirt");
        request.window_secs = Some(10.0);
        let response = engine.search(request, None).await.unwrap();
        assert!(response.results[0].transcript_refs.is_empty());
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected() {
        let engine = engine(ScriptedStore::default(), vec![]);

        let mut request = QueryRequest::new("q");
        request.top_n = 0;
        assert!(engine.search(request, None).await.is_err());

        let mut request = QueryRequest::new("q");
        request.weights.insert("frameVector".to_string(), -1.0);
        assert!(engine.search(request, None).await.is_err());

        let request = QueryRequest::new("   ");
        assert!(engine.search(request, None).await.is_err());
    }

    #[tokio::test]
    async fn declared_order_beats_completion_order() {
        // The slow pipeline is declared first; its payload must still
        // win representative status for the shared document.
        let mut store = ScriptedStore::default();
        let mut slow_hit = hit("shared", 0.9, 2.0);
        if let Evidence::Frame(f) = &mut slow_hit.evidence {
            f.description = "from slow".to_string();
        }
        let mut fast_hit = hit("shared", 5.0, 2.0);
        if let Evidence::Frame(f) = &mut fast_hit.evidence {
            f.description = "from fast".to_string();
        }
        store.vector_hits.insert("slow".to_string(), vec![slow_hit]);
        store.text_hits.insert("fast".to_string(), vec![fast_hit]);
        store.delay = Some(("slow".to_string(), Duration::from_millis(50)));

        let mut slow = pipeline("slowPipeline", PipelineKind::Vector, "slow");
        slow.timeout = Duration::from_secs(5);
        let fast = pipeline("fastPipeline", PipelineKind::Text, "fast");
        let engine = engine(store, vec![slow, fast]);

        let response = engine
            .search(QueryRequest::new("red shirt"), None)
            .await
            .unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].text, "from slow");
    }
}
