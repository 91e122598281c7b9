use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};
use validator::Validate;

use super::{ChatModel, ChatResponse, Message, ModelError, ModelParams, Role, Usage};

pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

fn default_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_n() -> u8 {
    1
}

/// Options accepted by the `chat_openai` constructor. Unknown keys are rejected.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ChatOpenAIParams {
    #[serde(default = "default_model", alias = "model_name")]
    #[validate(length(min = 1))]
    pub model: String,

    #[serde(default = "default_temperature")]
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,

    #[serde(default)]
    #[validate(range(min = 1))]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_n")]
    #[validate(range(min = 1))]
    pub n: u8,

    #[serde(default, alias = "openai_api_key")]
    pub api_key: Option<String>,

    #[serde(default, alias = "openai_api_base")]
    pub base_url: Option<String>,

    #[serde(default, alias = "openai_organization")]
    pub organization: Option<String>,
}

/// OpenAI chat-completions client.
pub struct ChatOpenAI {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    n: u8,
}

impl ChatOpenAI {
    /// Construct from a parameter map. Missing credentials fall back to `OPENAI_API_KEY`,
    /// the base URL to `OPENAI_API_BASE`.
    pub fn from_params(params: ModelParams) -> Result<Self, ModelError> {
        Self::from_params_with_env(params, |key| std::env::var(key).ok())
    }

    pub(crate) fn from_params_with_env<F>(params: ModelParams, env: F) -> Result<Self, ModelError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let params: ChatOpenAIParams = serde_json::from_value(serde_json::Value::Object(params))
            .map_err(|e| ModelError::InvalidParams(e.to_string()))?;
        Self::new(params, env)
    }

    fn new<F>(params: ChatOpenAIParams, env: F) -> Result<Self, ModelError>
    where
        F: Fn(&str) -> Option<String>,
    {
        params
            .validate()
            .map_err(|e| ModelError::InvalidParams(e.to_string()))?;

        let api_key = params
            .api_key
            .or_else(|| env("OPENAI_API_KEY"))
            .ok_or_else(|| {
                ModelError::MissingCredential(
                    "OPENAI_API_KEY not set and no api_key provided".to_string(),
                )
            })?;

        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = params.base_url.or_else(|| env("OPENAI_API_BASE")) {
            config = config.with_api_base(base_url);
        }
        if let Some(org) = params.organization {
            config = config.with_org_id(org);
        }

        info!(
            "Initialized OpenAI chat model: model={}, temperature={}",
            params.model, params.temperature
        );

        Ok(Self {
            client: Client::with_config(config),
            model: params.model,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            n: params.n,
        })
    }

    fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage, ModelError> {
        let built: Result<ChatCompletionRequestMessage, _> = match message.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(message.content.as_str())
                .build()
                .map(Into::into),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(message.content.as_str())
                .build()
                .map(Into::into),
            Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(message.content.as_str())
                .build()
                .map(Into::into),
        };
        built.map_err(|e| ModelError::InvalidParams(e.to_string()))
    }
}

#[async_trait]
impl ChatModel for ChatOpenAI {
    async fn invoke(&self, messages: &[Message]) -> Result<ChatResponse, ModelError> {
        let request_messages = messages
            .iter()
            .map(Self::to_request_message)
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(self.model.as_str())
            .messages(request_messages)
            .temperature(self.temperature)
            .n(self.n);
        if let Some(max_tokens) = self.max_tokens {
            builder.max_completion_tokens(max_tokens);
        }
        let request = builder
            .build()
            .map_err(|e| ModelError::InvalidParams(e.to_string()))?;

        debug!(
            "Sending chat completion: model={}, messages={}",
            self.model,
            messages.len()
        );

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ModelError::Api(format!("OpenAI API error: {}", e)))?;

        let usage = response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ModelError::Api("Response contained no message content".to_string()))?;

        Ok(ChatResponse { content, usage })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
