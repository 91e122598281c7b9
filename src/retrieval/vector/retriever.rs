use serde_json::Value;
use tracing::debug;

use super::store::PineconeVectorStore;
use super::types::Document;
use crate::error::{Error, Result};

pub const DEFAULT_RETRIEVER_K: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    /// Top `k` by similarity.
    Similarity,
    /// Top `k` by similarity, dropping matches whose relevance is below `score_threshold`.
    SimilarityScoreThreshold,
}

/// Recognized retriever settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieverOptions {
    pub search_type: SearchType,
    pub k: usize,
    /// Relevance in `[0, 1]`; only used by [`SearchType::SimilarityScoreThreshold`].
    pub score_threshold: Option<f32>,
    /// Metadata filter in the service's filter syntax.
    pub filter: Option<Value>,
    pub namespace: Option<String>,
}

impl Default for RetrieverOptions {
    fn default() -> Self {
        Self {
            search_type: SearchType::Similarity,
            k: DEFAULT_RETRIEVER_K,
            score_threshold: None,
            filter: None,
            namespace: None,
        }
    }
}

impl RetrieverOptions {
    pub fn similarity(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    pub fn score_threshold(k: usize, score_threshold: f32) -> Self {
        Self {
            search_type: SearchType::SimilarityScoreThreshold,
            k,
            score_threshold: Some(score_threshold),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::InvalidArgument("k must be positive".to_string()));
        }

        match (self.search_type, self.score_threshold) {
            (SearchType::SimilarityScoreThreshold, None) => {
                return Err(Error::InvalidArgument(
                    "score_threshold is required for similarity_score_threshold search"
                        .to_string(),
                ));
            }
            (SearchType::SimilarityScoreThreshold, Some(threshold))
                if !(0.0..=1.0).contains(&threshold) =>
            {
                return Err(Error::InvalidArgument(format!(
                    "score_threshold must be between 0 and 1, got {}",
                    threshold
                )));
            }
            (SearchType::Similarity, Some(_)) => {
                return Err(Error::InvalidArgument(
                    "score_threshold only applies to similarity_score_threshold search"
                        .to_string(),
                ));
            }
            _ => {}
        }

        if matches!(&self.filter, Some(filter) if !filter.is_object()) {
            return Err(Error::InvalidArgument(
                "filter must be a JSON object".to_string(),
            ));
        }

        Ok(())
    }
}

/// Returns documents relevant to a query from one vector store.
#[derive(Debug, Clone)]
pub struct Retriever {
    store: PineconeVectorStore,
    options: RetrieverOptions,
}

impl Retriever {
    pub(crate) fn new(store: PineconeVectorStore, options: RetrieverOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &RetrieverOptions {
        &self.options
    }

    pub async fn get_relevant_documents(&self, query: &str) -> Result<Vec<Document>> {
        let scored = self
            .store
            .similarity_search_with_score(
                query,
                self.options.k,
                self.options.filter.clone(),
                self.options.namespace.as_deref(),
            )
            .await?;

        let documents: Vec<Document> = match self.options.search_type {
            SearchType::Similarity => scored.into_iter().map(|(doc, _)| doc).collect(),
            SearchType::SimilarityScoreThreshold => {
                let threshold = self.options.score_threshold.unwrap_or_default();
                let metric = self.store.metric();
                scored
                    .into_iter()
                    .filter(|(_, score)| metric.relevance(*score) >= threshold)
                    .map(|(doc, _)| doc)
                    .collect()
            }
        };

        debug!(
            "Retriever returned {} documents for query ({:?})",
            documents.len(),
            self.options.search_type
        );
        Ok(documents)
    }
}
