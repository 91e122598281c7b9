//! Adapters for retrieval-augmented LLM applications.
//!
//! - [`models`]: a registry that builds chat-model clients by name.
//! - [`retrieval`]: a Pinecone-backed vector store bound to an Azure OpenAI embedding
//!   deployment, with index bootstrap, ingest, similarity search and retrievers.
//!
//! ```rust,ignore
//! use rag_adapters::{Config, Document, PineconeDB};
//!
//! let config = Config::from_env()?;
//! let mut db = PineconeDB::from_config(&config).await?;
//! db.ingest_data(vec![Document::new("hello world")]).await?;
//! let hits = db.similarity_search("hello", 3).await?;
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod retrieval;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{Error, Result};
pub use models::{ChatModel, Message, ModelParams, ModelRegistry};
pub use retrieval::vector::{AddDataOptions, Document, PineconeDB, RetrieverOptions};
