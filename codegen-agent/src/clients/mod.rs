pub mod anthropic;
pub mod openai;
pub mod retry;

use crate::config::Provider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use anthropic::AnthropicClient;
pub use openai::OpenAIClient;
pub use retry::{RetryConfig, RetryingGateway};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
    /// Set on tool results that report a failed call.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            is_error: false,
        }
    }

    pub fn assistant_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: String::new(),
            tool_calls: Some(calls),
            tool_call_id: None,
            is_error: false,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
            is_error: false,
        }
    }

    pub fn tool_error(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::tool_result(call_id, content)
        }
    }
}

/// A request from the model to run one registered tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Everything sent to the model for one think step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub system: String,
    pub messages: Vec<Message>,
}

/// What the model chose to do this cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    FinalAnswer(String),
    ToolCalls(Vec<ToolCall>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub provider: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LLMError {
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LLMError {
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            429 => LLMError::RateLimited(body),
            401 | 403 => LLMError::Authentication(body),
            _ => LLMError::Api {
                status,
                message: body,
            },
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            LLMError::RequestFailed(_) | LLMError::RateLimited(_) => true,
            LLMError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for LLMError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            LLMError::RequestFailed(format!("request timed out: {}", error))
        } else if error.is_decode() {
            LLMError::ParseError(error.to_string())
        } else {
            LLMError::RequestFailed(error.to_string())
        }
    }
}

/// The model provider as seen by the agent loop.
///
/// One awaited call per think step. Implementations do not retry unless
/// wrapped in a [`RetryingGateway`].
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn decide(
        &self,
        conversation: &Conversation,
        tools: &[ToolDefinition],
    ) -> Result<Decision, LLMError>;

    fn model_info(&self) -> ModelInfo;
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, LLMError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LLMError::ConfigError(e.to_string()))
}

pub fn create_gateway(config: &GatewayConfig) -> Result<Arc<dyn ModelGateway>, LLMError> {
    if config.api_key.trim().is_empty() {
        return Err(LLMError::ConfigError(format!(
            "missing API key for {}",
            config.provider
        )));
    }

    let gateway: Arc<dyn ModelGateway> = match config.provider {
        Provider::OpenAI => Arc::new(RetryingGateway::new(
            OpenAIClient::from_config(config)?,
            config.retry.clone(),
        )),
        Provider::Anthropic => Arc::new(RetryingGateway::new(
            AnthropicClient::from_config(config)?,
            config.retry.clone(),
        )),
    };

    Ok(gateway)
}
