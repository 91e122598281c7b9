use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::retriever::{Retriever, RetrieverOptions};
use super::types::{Document, IndexService, Metric, QueryMatch, QueryRequest, Record};
use crate::error::{Error, Result};
use crate::retrieval::embeddings::{EmbeddingError, EmbeddingProvider};

/// Metadata key holding a document's page content.
pub const DEFAULT_TEXT_KEY: &str = "text";
pub const DEFAULT_UPSERT_BATCH_SIZE: usize = 32;

/// Options for an incremental add.
#[derive(Debug, Clone, PartialEq)]
pub struct AddDataOptions {
    /// One id per document. Random UUIDs are generated when absent.
    pub ids: Option<Vec<String>>,
    /// Overrides the store's namespace for this call.
    pub namespace: Option<String>,
    /// Documents embedded and upserted per request.
    pub batch_size: usize,
}

impl Default for AddDataOptions {
    fn default() -> Self {
        Self {
            ids: None,
            namespace: None,
            batch_size: DEFAULT_UPSERT_BATCH_SIZE,
        }
    }
}

impl AddDataOptions {
    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn validate(&self, document_count: usize) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidArgument(
                "batch_size must be positive".to_string(),
            ));
        }

        if let Some(ids) = &self.ids {
            if ids.len() != document_count {
                return Err(Error::InvalidArgument(format!(
                    "got {} ids for {} documents",
                    ids.len(),
                    document_count
                )));
            }
            if ids.iter().any(|id| id.is_empty()) {
                return Err(Error::InvalidArgument("ids cannot be empty".to_string()));
            }
            let unique: HashSet<&str> = ids.iter().map(String::as_str).collect();
            if unique.len() != ids.len() {
                return Err(Error::InvalidArgument("ids must be unique".to_string()));
            }
        }

        if matches!(&self.namespace, Some(ns) if ns.is_empty()) {
            return Err(Error::InvalidArgument(
                "namespace cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// A view over one hosted index, bound to one embedding function.
#[derive(Clone)]
pub struct PineconeVectorStore {
    index: Arc<dyn IndexService>,
    embeddings: Arc<dyn EmbeddingProvider>,
    index_name: String,
    text_key: String,
    namespace: Option<String>,
    metric: Metric,
}

impl PineconeVectorStore {
    pub fn new(
        index: Arc<dyn IndexService>,
        embeddings: Arc<dyn EmbeddingProvider>,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            index,
            embeddings,
            index_name: index_name.into(),
            text_key: DEFAULT_TEXT_KEY.to_string(),
            namespace: None,
            metric: Metric::Cosine,
        }
    }

    pub fn with_text_key(mut self, text_key: impl Into<String>) -> Self {
        self.text_key = text_key.into();
        self
    }

    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Embed and upsert `docs` into `index_name`, returning a store bound to that index.
    pub async fn from_documents(
        docs: Vec<Document>,
        embeddings: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn IndexService>,
        index_name: impl Into<String>,
        namespace: Option<String>,
    ) -> Result<Self> {
        let store = Self::new(index, embeddings, index_name).with_namespace(namespace);
        store
            .add_documents(&docs, &AddDataOptions::default())
            .await?;
        Ok(store)
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    fn effective_namespace<'a>(&'a self, namespace: Option<&'a str>) -> Option<&'a str> {
        namespace.or(self.namespace.as_deref())
    }

    /// Embed and upsert documents. Returns the ids written, in input order.
    pub async fn add_documents(
        &self,
        docs: &[Document],
        options: &AddDataOptions,
    ) -> Result<Vec<String>> {
        options.validate(docs.len())?;
        if docs.is_empty() {
            debug!("No documents to add to index: {}", self.index_name);
            return Ok(Vec::new());
        }

        let ids = options
            .ids
            .clone()
            .unwrap_or_else(|| docs.iter().map(|_| Uuid::new_v4().to_string()).collect());
        let namespace = self.effective_namespace(options.namespace.as_deref());

        info!(
            "Adding {} documents to index '{}' (namespace: {:?})",
            docs.len(),
            self.index_name,
            namespace
        );

        for (batch, batch_ids) in docs
            .chunks(options.batch_size)
            .zip(ids.chunks(options.batch_size))
        {
            let texts: Vec<String> = batch.iter().map(|d| d.page_content.clone()).collect();
            let vectors = self.embeddings.embed(texts).await?;
            if vectors.len() != batch.len() {
                return Err(EmbeddingError::ApiError(format!(
                    "Expected {} embeddings, received {}",
                    batch.len(),
                    vectors.len()
                ))
                .into());
            }

            let records = batch
                .iter()
                .zip(batch_ids)
                .zip(vectors)
                .map(|((doc, id), values)| {
                    let mut metadata = doc.metadata.clone();
                    metadata.insert(
                        self.text_key.clone(),
                        Value::String(doc.page_content.clone()),
                    );
                    Record {
                        id: id.clone(),
                        values,
                        metadata,
                    }
                })
                .collect();

            self.index
                .upsert(&self.index_name, records, namespace)
                .await?;
        }

        Ok(ids)
    }

    /// The `k` most similar documents, most similar first.
    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        Ok(self
            .similarity_search_with_score(query, k, None, None)
            .await?
            .into_iter()
            .map(|(doc, _)| doc)
            .collect())
    }

    /// Like [`similarity_search`](Self::similarity_search), with the raw service score of each match.
    pub async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
        filter: Option<Value>,
        namespace: Option<&str>,
    ) -> Result<Vec<(Document, f32)>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be positive".to_string()));
        }

        let vector = self.embeddings.embed_query(query).await?;
        let mut request = QueryRequest::new(vector, k);
        request.namespace = self.effective_namespace(namespace).map(str::to_string);
        request.filter = filter;

        let matches = self.index.query(&self.index_name, request).await?;
        let mut results: Vec<(Document, f32)> = matches
            .into_iter()
            .filter_map(|m| self.to_document(m))
            .collect();
        results.truncate(k);

        debug!(
            "Similarity search on '{}' returned {} documents",
            self.index_name,
            results.len()
        );
        Ok(results)
    }

    /// Delete vectors by id.
    pub async fn delete(&self, ids: Vec<String>, namespace: Option<&str>) -> Result<()> {
        let namespace = self.effective_namespace(namespace);
        self.index
            .delete_vectors(&self.index_name, ids, namespace)
            .await?;
        Ok(())
    }

    pub fn as_retriever(&self, options: RetrieverOptions) -> Result<Retriever> {
        options.validate()?;
        Ok(Retriever::new(self.clone(), options))
    }

    fn to_document(&self, m: QueryMatch) -> Option<(Document, f32)> {
        let mut metadata = m.metadata.unwrap_or_default();
        match metadata.remove(&self.text_key) {
            Some(Value::String(page_content)) => Some((
                Document {
                    page_content,
                    metadata,
                },
                m.score,
            )),
            _ => {
                warn!(
                    "Match '{}' has no '{}' metadata, skipping",
                    m.id, self.text_key
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for PineconeVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeVectorStore")
            .field("index_name", &self.index_name)
            .field("text_key", &self.text_key)
            .field("namespace", &self.namespace)
            .field("metric", &self.metric)
            .field("embedding_model", &self.embeddings.model_name())
            .finish()
    }
}
