use async_openai::{
    config::AzureConfig,
    types::{CreateEmbeddingRequest, EmbeddingInput},
    Client,
};
use tracing::{debug, info};

use crate::config::AzureEmbeddingConfig;

/// Maximum number of texts sent in one embedding request.
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 1000;

/// Error types for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// The embedding function a vector store is bound to.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a list of texts, in input order
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single search query
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::ApiError("No embedding returned for query".to_string()))
    }

    /// Get the dimension of the embeddings
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Azure OpenAI embedding deployment.
pub struct AzureOpenAIEmbeddings {
    client: Client<AzureConfig>,
    deployment: String,
    dimension: usize,
    batch_size: usize,
}

impl AzureOpenAIEmbeddings {
    pub fn new(config: &AzureEmbeddingConfig, dimension: usize) -> Result<Self, EmbeddingError> {
        if config.deployment.trim().is_empty() {
            return Err(EmbeddingError::ConfigError(
                "Azure embedding deployment name is empty".to_string(),
            ));
        }

        let mut azure = AzureConfig::new()
            .with_deployment_id(config.deployment.as_str())
            .with_api_version(config.api_version.as_str());
        if let Some(endpoint) = &config.endpoint {
            azure = azure.with_api_base(endpoint.as_str());
        }
        if let Some(api_key) = &config.api_key {
            azure = azure.with_api_key(api_key.as_str());
        }

        info!(
            "Initialized Azure OpenAI embeddings: deployment={}, api_version={}, dimension={}",
            config.deployment, config.api_version, dimension
        );

        Ok(Self {
            client: Client::with_config(azure),
            deployment: config.deployment.clone(),
            dimension,
            batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Embed texts in batches to stay under the per-request input limit
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            debug!("Embedding batch of {} texts", chunk.len());

            let request = CreateEmbeddingRequest {
                model: self.deployment.clone(),
                input: EmbeddingInput::StringArray(chunk.to_vec()),
                encoding_format: None,
                user: None,
                dimensions: None,
            };

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| EmbeddingError::ApiError(format!("Azure OpenAI API error: {}", e)))?;

            if response.data.len() != chunk.len() {
                return Err(EmbeddingError::ApiError(format!(
                    "Expected {} embeddings, received {}",
                    chunk.len(),
                    response.data.len()
                )));
            }

            let mut data = response.data;
            data.sort_by_key(|d| d.index);
            all_embeddings.extend(data.into_iter().map(|d| d.embedding));
        }

        Ok(all_embeddings)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for AzureOpenAIEmbeddings {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.iter().any(|t| t.is_empty()) {
            return Err(EmbeddingError::InvalidInput(
                "Cannot embed an empty string".to_string(),
            ));
        }

        info!("Generating embeddings for {} texts", texts.len());
        self.embed_batch(texts).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.deployment
    }
}
