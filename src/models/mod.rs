//! Chat-model factory.
//!
//! A [`ModelRegistry`] maps symbolic names to constructors. [`ModelRegistry::get_model`]
//! instantiates the named model with a JSON parameter map whose shape is defined by the
//! constructor itself.

pub mod openai;
pub mod registry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openai::{ChatOpenAI, ChatOpenAIParams};
pub use registry::{ModelConstructor, ModelRegistry, ModelRegistryBuilder};

/// Constructor arguments, forwarded to the registered constructor.
pub type ModelParams = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Invalid model parameters: {0}")]
    InvalidParams(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("API error: {0}")]
    Api(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown model '{name}'. Registered models: {}", known.join(", "))]
    UnknownModel { name: String, known: Vec<String> },
}

/// A queryable chat model produced by a registered constructor.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one chat completion over the given conversation.
    async fn invoke(&self, messages: &[Message]) -> Result<ChatResponse, ModelError>;

    fn model_name(&self) -> &str;
}
