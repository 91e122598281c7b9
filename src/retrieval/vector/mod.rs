pub mod db;
pub mod pinecone;
pub mod retriever;
pub mod store;
pub mod types;

pub use db::{PineconeDB, DEFAULT_K};
pub use pinecone::PineconeClient;
pub use retriever::{Retriever, RetrieverOptions, SearchType};
pub use store::{AddDataOptions, PineconeVectorStore};
pub use types::{
    CreateIndexRequest, Document, IndexDescription, IndexService, IndexSpec, IndexStatus, Metric,
    QueryMatch, QueryRequest, Record, ServerlessSpec, VectorError,
};
