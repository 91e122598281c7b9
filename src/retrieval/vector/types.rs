use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A unit of content plus metadata, as ingested into and returned from a vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Document {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Similarity metric of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cosine,
    Euclidean,
    Dotproduct,
}

impl Metric {
    /// Map a raw service score onto a `[0, 1]` relevance scale.
    pub fn relevance(&self, score: f32) -> f32 {
        match self {
            Metric::Cosine => (score + 1.0) / 2.0,
            Metric::Euclidean => 1.0 - score / std::f32::consts::SQRT_2,
            Metric::Dotproduct => score,
        }
    }
}

/// Hosting configuration for an index that needs no capacity provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerlessSpec {
    pub cloud: String,
    pub region: String,
}

impl Default for ServerlessSpec {
    fn default() -> Self {
        Self {
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serverless: Option<ServerlessSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod: Option<Value>,
}

impl From<ServerlessSpec> for IndexSpec {
    fn from(spec: ServerlessSpec) -> Self {
        Self {
            serverless: Some(spec),
            pod: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStatus {
    pub ready: bool,
    pub state: String,
}

impl IndexDescription {
    /// Whether the data plane accepts requests. A description without status counts as ready.
    pub fn is_ready(&self) -> bool {
        self.status.as_ref().map_or(true, |status| status.ready)
    }
}

/// Index metadata as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    #[serde(default)]
    pub host: String,
    pub spec: IndexSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<IndexStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateIndexRequest {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    pub spec: IndexSpec,
}

/// One vector as written to an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

/// Nearest-neighbour query against one index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub include_metadata: bool,
    pub include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

impl QueryRequest {
    pub fn new(vector: Vec<f32>, top_k: usize) -> Self {
        Self {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: None,
            filter: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

/// Error types for vector database operations
#[derive(Debug, thiserror::Error)]
pub enum VectorError {
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Index already exists: {0}")]
    AlreadyExists(String),

    #[error("Service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Index '{index}' not ready after {waited:?}")]
    NotReady { index: String, waited: Duration },
}

/// Control- and data-plane operations of a hosted vector database.
#[async_trait]
pub trait IndexService: Send + Sync {
    async fn list_indexes(&self) -> Result<Vec<IndexDescription>, VectorError>;

    async fn create_index(&self, request: CreateIndexRequest)
        -> Result<IndexDescription, VectorError>;

    async fn describe_index(&self, name: &str) -> Result<IndexDescription, VectorError>;

    async fn delete_index(&self, name: &str) -> Result<(), VectorError>;

    /// Insert or overwrite records. Returns the number of records written.
    async fn upsert(
        &self,
        index: &str,
        records: Vec<Record>,
        namespace: Option<&str>,
    ) -> Result<usize, VectorError>;

    /// Matches ordered by descending score.
    async fn query(&self, index: &str, request: QueryRequest)
        -> Result<Vec<QueryMatch>, VectorError>;

    async fn delete_vectors(
        &self,
        index: &str,
        ids: Vec<String>,
        namespace: Option<&str>,
    ) -> Result<(), VectorError>;

    /// Whether an index with this name exists.
    async fn has_index(&self, name: &str) -> Result<bool, VectorError> {
        Ok(self
            .list_indexes()
            .await?
            .iter()
            .any(|index| index.name == name))
    }
}
