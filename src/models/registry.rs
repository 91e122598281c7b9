use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{ChatModel, ChatOpenAI, ModelError, ModelParams, RegistryError};
use crate::error::Result;

/// Builds a model instance from its parameter map.
pub type ModelConstructor =
    Arc<dyn Fn(ModelParams) -> std::result::Result<Box<dyn ChatModel>, ModelError> + Send + Sync>;

/// Immutable name → constructor mapping. Build one with [`ModelRegistry::builder`].
#[derive(Clone)]
pub struct ModelRegistry {
    constructors: HashMap<String, ModelConstructor>,
}

#[derive(Default)]
pub struct ModelRegistryBuilder {
    constructors: HashMap<String, ModelConstructor>,
}

impl ModelRegistryBuilder {
    /// Register a constructor. A later registration under the same name replaces the earlier one.
    pub fn register<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(ModelParams) -> std::result::Result<Box<dyn ChatModel>, ModelError>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        if self
            .constructors
            .insert(name.clone(), Arc::new(constructor))
            .is_some()
        {
            warn!("Replacing model constructor registered as '{}'", name);
        }
        self
    }

    pub fn build(self) -> ModelRegistry {
        ModelRegistry {
            constructors: self.constructors,
        }
    }
}

impl ModelRegistry {
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::default()
    }

    /// The stock registry: `chat_openai` → [`ChatOpenAI`].
    pub fn with_defaults() -> Self {
        Self::builder()
            .register("chat_openai", |params| {
                ChatOpenAI::from_params(params).map(|model| Box::new(model) as Box<dyn ChatModel>)
            })
            .build()
    }

    /// Instantiate the model registered as `model_name` with `model_params`.
    pub fn get_model(
        &self,
        model_name: &str,
        model_params: ModelParams,
    ) -> Result<Box<dyn ChatModel>> {
        let constructor =
            self.constructors
                .get(model_name)
                .ok_or_else(|| RegistryError::UnknownModel {
                    name: model_name.to_string(),
                    known: self.names(),
                })?;

        debug!(
            "Constructing model '{}' with {} parameter(s)",
            model_name,
            model_params.len()
        );

        Ok(constructor(model_params)?)
    }

    pub fn contains(&self, model_name: &str) -> bool {
        self.constructors.contains_key(model_name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.names())
            .finish()
    }
}
