use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::pinecone::PineconeClient;
use super::retriever::{Retriever, RetrieverOptions};
use super::store::{AddDataOptions, PineconeVectorStore};
use super::types::{CreateIndexRequest, Document, IndexService, VectorError};
use crate::config::{Config, PineconeConfig};
use crate::error::{Error, Result};
use crate::retrieval::embeddings::{AzureOpenAIEmbeddings, EmbeddingProvider};

/// Result count used when the caller has no preference.
pub const DEFAULT_K: usize = 3;

/// Upper bound on the wait for a newly created index to accept requests.
pub const INDEX_READY_TIMEOUT: Duration = Duration::from_secs(300);
const INDEX_READY_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Owns one hosted index and the store view bound to it.
///
/// Construction makes sure the configured index exists (creating it if absent), so a
/// `PineconeDB` value is always ready for ingest and search.
pub struct PineconeDB {
    index: Arc<dyn IndexService>,
    embeddings: Arc<dyn EmbeddingProvider>,
    config: PineconeConfig,
    vectorstore: PineconeVectorStore,
}

impl PineconeDB {
    /// Wire the Pinecone REST client and the Azure embedding deployment from `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let index: Arc<dyn IndexService> = Arc::new(PineconeClient::new(&config.pinecone));
        let embeddings: Arc<dyn EmbeddingProvider> = Arc::new(AzureOpenAIEmbeddings::new(
            &config.embedding,
            config.pinecone.dimension,
        )?);
        Self::new(config.pinecone.clone(), index, embeddings).await
    }

    pub async fn new(
        config: PineconeConfig,
        index: Arc<dyn IndexService>,
        embeddings: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        if embeddings.dimension() != config.dimension {
            warn!(
                "Embedding dimension {} differs from index dimension {}",
                embeddings.dimension(),
                config.dimension
            );
        }

        Self::ensure_index(index.as_ref(), &config).await?;

        let vectorstore = Self::bind_store(&config, index.clone(), embeddings.clone());

        info!("Vector store ready on index '{}'", config.index_name);
        Ok(Self {
            index,
            embeddings,
            config,
            vectorstore,
        })
    }

    fn bind_store(
        config: &PineconeConfig,
        index: Arc<dyn IndexService>,
        embeddings: Arc<dyn EmbeddingProvider>,
    ) -> PineconeVectorStore {
        PineconeVectorStore::new(index, embeddings, config.index_name.clone())
            .with_namespace(config.namespace.clone())
            .with_metric(config.metric)
    }

    /// Create the configured index unless one with that name already exists, then wait
    /// until the service reports it ready.
    async fn ensure_index(index: &dyn IndexService, config: &PineconeConfig) -> Result<()> {
        if index.has_index(&config.index_name).await? {
            debug!("Index '{}' already exists", config.index_name);
            return Ok(());
        }

        let created = index
            .create_index(CreateIndexRequest {
                name: config.index_name.clone(),
                dimension: config.dimension,
                metric: config.metric,
                spec: config.spec.clone().into(),
            })
            .await;

        match created {
            Ok(description) => {
                info!(
                    "Created index '{}' ({} dims, {:?}, {}/{})",
                    config.index_name,
                    config.dimension,
                    config.metric,
                    config.spec.cloud,
                    config.spec.region
                );
                if !description.is_ready() {
                    Self::wait_until_ready(
                        index,
                        &config.index_name,
                        INDEX_READY_POLL_INTERVAL,
                        INDEX_READY_TIMEOUT,
                    )
                    .await?;
                }
            }
            // Created concurrently by someone else after our listing.
            Err(VectorError::AlreadyExists(_)) => {
                debug!("Index '{}' appeared before create", config.index_name);
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Poll `describe_index` until the index is ready or `timeout` elapses.
    async fn wait_until_ready(
        index: &dyn IndexService,
        name: &str,
        interval: Duration,
        timeout: Duration,
    ) -> Result<()> {
        let started = Instant::now();
        loop {
            let description = index.describe_index(name).await?;
            if description.is_ready() {
                info!("Index '{}' ready after {:?}", name, started.elapsed());
                return Ok(());
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(VectorError::NotReady {
                    index: name.to_string(),
                    waited,
                }
                .into());
            }
            debug!(
                "Index '{}' not ready yet (state: {:?})",
                name,
                description.status.map(|s| s.state)
            );
            sleep(interval.min(timeout - waited)).await;
        }
    }

    pub fn index_name(&self) -> &str {
        &self.config.index_name
    }

    pub fn store(&self) -> &PineconeVectorStore {
        &self.vectorstore
    }

    /// Embed and upsert `docs` into the configured index and rebind the store view.
    ///
    /// Records are upserted: existing vectors stay, equal ids are overwritten.
    pub async fn ingest_data(&mut self, docs: Vec<Document>) -> Result<()> {
        info!(
            "Ingesting {} documents into index '{}'",
            docs.len(),
            self.config.index_name
        );

        self.vectorstore = PineconeVectorStore::from_documents(
            docs,
            self.embeddings.clone(),
            self.index.clone(),
            self.config.index_name.clone(),
            self.config.namespace.clone(),
        )
        .await?
        .with_metric(self.config.metric);
        Ok(())
    }

    /// Incrementally add documents. Returns the ids written.
    pub async fn add_data(
        &self,
        docs: &[Document],
        options: AddDataOptions,
    ) -> Result<Vec<String>> {
        self.vectorstore.add_documents(docs, &options).await
    }

    /// The `k` most similar documents, most similar first. See [`DEFAULT_K`].
    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be positive".to_string()));
        }
        self.vectorstore.similarity_search(query, k).await
    }

    pub async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(Document, f32)>> {
        self.vectorstore
            .similarity_search_with_score(query, k, None, None)
            .await
    }

    pub fn vectorstore_retriever(&self, options: RetrieverOptions) -> Result<Retriever> {
        self.vectorstore.as_retriever(options)
    }

    /// Delete the named index. No existence check is made first.
    pub async fn delete_index(&self, name: &str) -> Result<()> {
        warn!("Deleting index '{}'", name);
        self.index.delete_index(name).await?;
        Ok(())
    }
}
