//! In-process stand-ins for the hosted services, used by unit tests.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::retrieval::embeddings::{EmbeddingError, EmbeddingProvider};
use crate::retrieval::vector::{
    CreateIndexRequest, IndexDescription, IndexService, IndexStatus, Metric, QueryMatch,
    QueryRequest, Record, ServerlessSpec, VectorError,
};

/// Bag-of-words embedder: each lowercase token bumps one hashed bucket, then the
/// vector is L2-normalized. Texts sharing words get a positive cosine score.
pub struct HashingEmbeddings {
    dimension: usize,
}

impl HashingEmbeddings {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % self.dimension as u64) as usize] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddings {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hashing"
    }
}

struct MemoryIndex {
    description: IndexDescription,
    /// namespace -> id -> record; the default namespace is ""
    namespaces: HashMap<String, BTreeMap<String, Record>>,
}

/// A vector database held in memory, counting control-plane calls.
#[derive(Default)]
pub struct InMemoryIndexService {
    indexes: Mutex<HashMap<String, MemoryIndex>>,
    create_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
    describe_calls: AtomicUsize,
    /// describes that still report a new index as initializing
    pending_ready_polls: AtomicUsize,
    next_list: Mutex<Option<Result<Vec<IndexDescription>, VectorError>>>,
}

impl InMemoryIndexService {
    pub async fn create_test_index(&self, name: &str, dimension: usize) {
        self.create_index(CreateIndexRequest {
            name: name.to_string(),
            dimension,
            metric: Metric::Cosine,
            spec: ServerlessSpec::default().into(),
        })
        .await
        .unwrap();
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn fail_next_list(&self, error: VectorError) {
        *self.next_list.lock().unwrap() = Some(Err(error));
    }

    /// The next listing reports no indexes, as if taken before a concurrent create.
    pub fn empty_next_list(&self) {
        *self.next_list.lock().unwrap() = Some(Ok(Vec::new()));
    }

    /// Indexes created from now on report ready only on the `polls`-th describe.
    pub fn delay_readiness(&self, polls: usize) {
        self.pending_ready_polls.store(polls, Ordering::SeqCst);
    }

    pub fn record(&self, index: &str, namespace: Option<&str>, id: &str) -> Option<Record> {
        let indexes = self.indexes.lock().unwrap();
        indexes
            .get(index)?
            .namespaces
            .get(namespace.unwrap_or_default())?
            .get(id)
            .cloned()
    }

    pub fn record_count(&self, index: &str, namespace: Option<&str>) -> usize {
        let indexes = self.indexes.lock().unwrap();
        indexes
            .get(index)
            .and_then(|i| i.namespaces.get(namespace.unwrap_or_default()))
            .map(|records| records.len())
            .unwrap_or(0)
    }
}

fn status(ready: bool) -> IndexStatus {
    IndexStatus {
        ready,
        state: if ready { "Ready" } else { "Initializing" }.to_string(),
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Equality filters only: `{"key": value}` or `{"key": {"$eq": value}}`.
fn matches_filter(metadata: &Map<String, Value>, filter: &Value) -> bool {
    let Some(conditions) = filter.as_object() else {
        return false;
    };
    conditions.iter().all(|(key, condition)| {
        let expected = condition.get("$eq").unwrap_or(condition);
        metadata.get(key) == Some(expected)
    })
}

#[async_trait]
impl IndexService for InMemoryIndexService {
    async fn list_indexes(&self) -> Result<Vec<IndexDescription>, VectorError> {
        if let Some(result) = self.next_list.lock().unwrap().take() {
            return result;
        }
        let indexes = self.indexes.lock().unwrap();
        Ok(indexes.values().map(|i| i.description.clone()).collect())
    }

    async fn create_index(
        &self,
        request: CreateIndexRequest,
    ) -> Result<IndexDescription, VectorError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut indexes = self.indexes.lock().unwrap();
        if indexes.contains_key(&request.name) {
            return Err(VectorError::AlreadyExists(request.name));
        }

        let description = IndexDescription {
            host: format!("{}.memory.local", request.name),
            name: request.name.clone(),
            dimension: request.dimension,
            metric: request.metric,
            spec: request.spec,
            status: Some(status(self.pending_ready_polls.load(Ordering::SeqCst) == 0)),
        };
        indexes.insert(
            request.name,
            MemoryIndex {
                description: description.clone(),
                namespaces: HashMap::new(),
            },
        );
        Ok(description)
    }

    async fn describe_index(&self, name: &str) -> Result<IndexDescription, VectorError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        let mut indexes = self.indexes.lock().unwrap();
        let target = indexes
            .get_mut(name)
            .ok_or_else(|| VectorError::IndexNotFound(name.to_string()))?;

        if !target.description.is_ready() {
            let pending = self.pending_ready_polls.load(Ordering::SeqCst);
            if pending > 0 {
                self.pending_ready_polls.store(pending - 1, Ordering::SeqCst);
            }
            if pending <= 1 {
                target.description.status = Some(status(true));
            }
        }
        Ok(target.description.clone())
    }

    async fn delete_index(&self, name: &str) -> Result<(), VectorError> {
        let mut indexes = self.indexes.lock().unwrap();
        indexes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| VectorError::IndexNotFound(name.to_string()))
    }

    async fn upsert(
        &self,
        index: &str,
        records: Vec<Record>,
        namespace: Option<&str>,
    ) -> Result<usize, VectorError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        let mut indexes = self.indexes.lock().unwrap();
        let target = indexes
            .get_mut(index)
            .ok_or_else(|| VectorError::IndexNotFound(index.to_string()))?;

        let dimension = target.description.dimension;
        if let Some(bad) = records.iter().find(|r| r.values.len() != dimension) {
            return Err(VectorError::Api {
                status: 400,
                message: format!(
                    "Vector dimension {} does not match the dimension of the index {}",
                    bad.values.len(),
                    dimension
                ),
            });
        }

        let count = records.len();
        let store = target
            .namespaces
            .entry(namespace.unwrap_or_default().to_string())
            .or_default();
        for record in records {
            store.insert(record.id.clone(), record);
        }
        Ok(count)
    }

    async fn query(
        &self,
        index: &str,
        request: QueryRequest,
    ) -> Result<Vec<QueryMatch>, VectorError> {
        let indexes = self.indexes.lock().unwrap();
        let target = indexes
            .get(index)
            .ok_or_else(|| VectorError::IndexNotFound(index.to_string()))?;

        let Some(records) = target
            .namespaces
            .get(request.namespace.as_deref().unwrap_or_default())
        else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<QueryMatch> = records
            .values()
            .filter(|r| {
                request
                    .filter
                    .as_ref()
                    .map_or(true, |f| matches_filter(&r.metadata, f))
            })
            .map(|r| QueryMatch {
                id: r.id.clone(),
                score: cosine(&request.vector, &r.values),
                values: if request.include_values {
                    r.values.clone()
                } else {
                    Vec::new()
                },
                metadata: request.include_metadata.then(|| r.metadata.clone()),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(request.top_k);
        Ok(matches)
    }

    async fn delete_vectors(
        &self,
        index: &str,
        ids: Vec<String>,
        namespace: Option<&str>,
    ) -> Result<(), VectorError> {
        let mut indexes = self.indexes.lock().unwrap();
        let target = indexes
            .get_mut(index)
            .ok_or_else(|| VectorError::IndexNotFound(index.to_string()))?;
        if let Some(records) = target.namespaces.get_mut(namespace.unwrap_or_default()) {
            for id in ids {
                records.remove(&id);
            }
        }
        Ok(())
    }
}
