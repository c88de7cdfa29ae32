//! In-process evidence store.
//!
//! Reference implementation of [`EvidenceStore`]: tantivy BM25 for text
//! search, brute-force cosine over stored embeddings for vector search.
//! All collections share one tantivy index with a collection filter
//! term, the same way a real engine scopes a search index.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, STORED, STRING, Schema, TextFieldIndexing, TextOptions, Value,
};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

use crate::config::StorageConfig;
use crate::error::{ClipseekError, Result};
use crate::evidence::{DocId, Evidence};
use crate::store::{EvidenceStore, IndexAdmin, SearchHit, TextSearchMode};

/// One logical collection: payloads keyed by id.
#[derive(Default)]
struct Collection {
    docs: HashMap<DocId, Evidence>,
}

/// Field handles for the shared text schema.
#[derive(Clone, Copy)]
struct TextFields {
    id: Field,
    collection: Field,
    text: Field,
}

pub struct MemoryStore {
    config: StorageConfig,
    collections: RwLock<HashMap<String, Collection>>,
    index: Index,
    reader: IndexReader,
    writer: RwLock<IndexWriter>,
    fields: TextFields,
    ready_indexes: RwLock<HashSet<String>>,
    /// Documents rejected at insert time (failed validation).
    skipped: AtomicU64,
}

impl MemoryStore {
    /// Create a store with the configured collections pre-registered.
    pub fn new(config: StorageConfig) -> Result<Self> {
        let schema = build_schema();
        let fields = extract_fields(&schema)?;

        let index = Index::create_in_ram(schema);
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let writer = index.writer(15_000_000)?;

        let mut collections = HashMap::new();
        collections.insert(config.frames_collection.clone(), Collection::default());
        collections.insert(config.transcripts_collection.clone(), Collection::default());

        Ok(Self {
            config,
            collections: RwLock::new(collections),
            index,
            reader,
            writer: RwLock::new(writer),
            fields,
            ready_indexes: RwLock::new(HashSet::new()),
            skipped: AtomicU64::new(0),
        })
    }

    /// Insert one validated document.
    pub fn insert(&self, collection: &str, doc_id: DocId, evidence: Evidence) -> Result<()> {
        evidence.validate()?;

        {
            let mut collections = self.collections.write();
            let coll = collections
                .get_mut(collection)
                .ok_or_else(|| ClipseekError::UnknownCollection(collection.to_string()))?;
            coll.docs.insert(doc_id.clone(), evidence.clone());
        }

        let mut doc = TantivyDocument::new();
        doc.add_text(self.fields.id, doc_id.as_str());
        doc.add_text(self.fields.collection, collection);
        doc.add_text(self.fields.text, evidence.text());

        let writer = self.writer.write();
        writer.delete_term(Term::from_field_text(self.fields.id, doc_id.as_str()));
        writer.add_document(doc)?;
        Ok(())
    }

    /// Insert a batch, skipping documents that fail validation.
    /// Returns the number inserted; skips are counted in the
    /// diagnostic counter.
    pub fn insert_many(
        &self,
        collection: &str,
        docs: impl IntoIterator<Item = (DocId, Evidence)>,
    ) -> Result<usize> {
        let mut inserted = 0;
        for (doc_id, evidence) in docs {
            match self.insert(collection, doc_id, evidence) {
                Ok(()) => inserted += 1,
                Err(ClipseekError::InvalidDocument(reason)) => {
                    self.skipped.fetch_add(1, Ordering::Relaxed);
                    debug!(collection, reason, "skipping malformed document");
                }
                Err(other) => return Err(other),
            }
        }
        Ok(inserted)
    }

    /// Commit pending text-index changes and mark the configured search
    /// indexes queryable.
    pub fn commit(&self) -> Result<()> {
        {
            let mut writer = self.writer.write();
            writer.commit()?;
        }
        self.reader.reload()?;

        let mut ready = self.ready_indexes.write();
        ready.insert(self.config.frame_vector_index.clone());
        ready.insert(self.config.frame_text_index.clone());
        ready.insert(self.config.transcript_vector_index.clone());
        Ok(())
    }

    /// Documents rejected at insert time.
    #[must_use]
    pub fn skipped_count(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Fetch a document by id, searching the named collection.
    #[must_use]
    pub fn get(&self, collection: &str, doc_id: &DocId) -> Option<Evidence> {
        self.collections
            .read()
            .get(collection)?
            .docs
            .get(doc_id)
            .cloned()
    }

    /// All documents in a collection, in unspecified order.
    #[must_use]
    pub fn all(&self, collection: &str) -> Vec<(DocId, Evidence)> {
        self.collections.read().get(collection).map_or_else(Vec::new, |c| {
            c.docs.iter().map(|(id, e)| (id.clone(), e.clone())).collect()
        })
    }

    #[must_use]
    pub fn storage_config(&self) -> &StorageConfig {
        &self.config
    }
}

impl EvidenceStore for MemoryStore {
    fn vector_search(
        &self,
        collection: &str,
        query: &[f32],
        num_candidates: usize,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let collections = self.collections.read();
        let coll = collections
            .get(collection)
            .ok_or_else(|| ClipseekError::UnknownCollection(collection.to_string()))?;

        // Documents without an embedding (or with a mismatched
        // dimension) cannot participate in vector search.
        let mut hits: Vec<SearchHit> = coll
            .docs
            .iter()
            .filter_map(|(id, evidence)| {
                let embedding = evidence.embedding()?;
                if embedding.len() != query.len() {
                    return None;
                }
                Some(SearchHit {
                    doc_id: id.clone(),
                    score: cosine_similarity(query, embedding),
                    evidence: evidence.clone(),
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        hits.truncate(limit.min(num_candidates));
        Ok(hits)
    }

    fn text_search(
        &self,
        collection: &str,
        query: &str,
        mode: TextSearchMode,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        if !self.collections.read().contains_key(collection) {
            return Err(ClipseekError::UnknownCollection(collection.to_string()));
        }

        let searcher = self.reader.searcher();

        let query_parser = QueryParser::for_index(&self.index, vec![self.fields.text]);
        let query_text = match mode {
            TextSearchMode::Text => query.to_string(),
            // Quote the whole query so tantivy matches it as one phrase.
            TextSearchMode::Phrase => format!("\"{}\"", query.replace('"', " ")),
        };
        let parsed = query_parser
            .parse_query(&query_text)
            .map_err(|e| ClipseekError::QueryParse(format!("failed to parse query: {e}")))?;

        let collection_filter = TermQuery::new(
            Term::from_field_text(self.fields.collection, collection),
            IndexRecordOption::Basic,
        );
        let scoped = BooleanQuery::new(vec![
            (Occur::Must, parsed),
            (Occur::Must, Box::new(collection_filter) as Box<dyn Query>),
        ]);

        let top_docs = searcher.search(&scoped, &TopDocs::with_limit(limit))?;

        let collections = self.collections.read();
        let coll = collections
            .get(collection)
            .ok_or_else(|| ClipseekError::UnknownCollection(collection.to_string()))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            let Some(id) = doc.get_first(self.fields.id).and_then(|v| v.as_str()) else {
                continue;
            };
            let doc_id = DocId::from(id);
            // The payload may have been removed since the last commit.
            let Some(evidence) = coll.docs.get(&doc_id) else {
                continue;
            };
            hits.push(SearchHit {
                doc_id,
                score: f64::from(score),
                evidence: evidence.clone(),
            });
        }
        Ok(hits)
    }
}

impl IndexAdmin for MemoryStore {
    fn index_ready(&self, index: &str) -> Result<bool> {
        Ok(self.ready_indexes.read().contains(index))
    }
}

fn build_schema() -> Schema {
    let mut builder = Schema::builder();

    let text_options = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer("default")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );

    builder.add_text_field("id", STRING | STORED);
    builder.add_text_field("collection", STRING | STORED);
    builder.add_text_field("text", text_options);

    builder.build()
}

fn extract_fields(schema: &Schema) -> Result<TextFields> {
    let field = |name: &str| {
        schema.get_field(name).map_err(|_| {
            ClipseekError::SearchIndex(tantivy::TantivyError::SchemaError(format!(
                "missing {name} field"
            )))
        })
    };
    Ok(TextFields {
        id: field("id")?,
        collection: field("collection")?,
        text: field("text")?,
    })
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
