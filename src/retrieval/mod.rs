pub mod embeddings;
pub mod vector;

pub use embeddings::{AzureOpenAIEmbeddings, EmbeddingError, EmbeddingProvider};
pub use vector::{Document, PineconeDB, VectorError};
