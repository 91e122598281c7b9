use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::retrieval::vector::{Metric, ServerlessSpec};

pub const DEFAULT_CONTROLLER_HOST: &str = "https://api.pinecone.io";
pub const DEFAULT_PINECONE_API_VERSION: &str = "2024-07";
pub const DEFAULT_DIMENSION: usize = 1536;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

/// Settings for the Pinecone control and data planes.
#[derive(Debug, Clone)]
pub struct PineconeConfig {
    pub api_key: String,
    pub index_name: String,
    pub controller_host: String,
    pub api_version: String,
    pub namespace: Option<String>,
    pub dimension: usize,
    pub metric: Metric,
    pub spec: ServerlessSpec,
}

/// Settings for the Azure OpenAI embedding deployment.
#[derive(Debug, Clone)]
pub struct AzureEmbeddingConfig {
    pub deployment: String,
    pub api_version: String,
    /// Falls back to the async-openai default when unset.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

/// Process configuration, read once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub pinecone: PineconeConfig,
    pub embedding: AzureEmbeddingConfig,
}

impl Config {
    /// Load `.env` (if present) and read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        info!(
            "Configuration loaded: index={}, embedding deployment={}",
            config.pinecone.index_name, config.embedding.deployment
        );
        Ok(config)
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let controller_host = optional("PINECONE_CONTROLLER_HOST")
            .unwrap_or_else(|| DEFAULT_CONTROLLER_HOST.to_string());
        Url::parse(&controller_host).map_err(|e| ConfigError::InvalidValue {
            name: "PINECONE_CONTROLLER_HOST".to_string(),
            reason: e.to_string(),
        })?;

        let pinecone = PineconeConfig {
            api_key: required("PINECONE_API_KEY")?,
            index_name: required("PINECONE_INDEX_NAME")?,
            controller_host: controller_host.trim_end_matches('/').to_string(),
            api_version: optional("PINECONE_API_VERSION")
                .unwrap_or_else(|| DEFAULT_PINECONE_API_VERSION.to_string()),
            namespace: optional("PINECONE_NAMESPACE"),
            dimension: DEFAULT_DIMENSION,
            metric: Metric::Cosine,
            spec: ServerlessSpec::default(),
        };

        let embedding = AzureEmbeddingConfig {
            deployment: required("AZURE_OPENAI_EMBEDDING_DEPLOYMENT_NAME")?,
            api_version: required("AZURE_OPENAI_API_VERSION")?,
            endpoint: optional("AZURE_OPENAI_ENDPOINT"),
            api_key: optional("AZURE_OPENAI_API_KEY"),
        };

        Ok(Self {
            pinecone,
            embedding,
        })
    }
}
