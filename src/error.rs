use thiserror::Error;

use crate::config::ConfigError;
use crate::models::{ModelError, RegistryError};
use crate::retrieval::{EmbeddingError, VectorError};

/// Crate-wide error, one variant per origin so callers can tell them apart.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector database error: {0}")]
    Vector(#[from] VectorError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True when the error came from one of the hosted services rather than local validation.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Error::Model(_) | Error::Embedding(_) | Error::Vector(_)
        )
    }
}
