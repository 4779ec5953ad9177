//! Anthropic Messages API gateway.
//!
//! Differences from the chat-completions shape:
//! - `x-api-key` header authentication and an `anthropic-version` header
//! - the system prompt is a top-level field, not a message
//! - tool calls and results travel as `tool_use` / `tool_result` content blocks,
//!   and all results answering one assistant turn share a single user message

use super::{
    Conversation, Decision, GatewayConfig, LLMError, MessageRole, ModelGateway, ModelInfo,
    ToolCall, ToolDefinition, http_client,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicClient {
    api_key: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: u32,
    client: reqwest::Client,
    base_url: String,
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: Option<&'a str>,
    messages: Vec<ApiMessage>,
    tools: Option<Vec<ApiTool<'a>>>,
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: ApiContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct ApiTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String, base_url: Option<String>) -> Self {
        Self {
            api_key,
            model,
            temperature: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            client: reqwest::Client::new(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, LLMError> {
        let mut client = Self::new(
            config.api_key.clone(),
            config.model.clone(),
            config.base_url.clone(),
        )
        .with_temperature(config.temperature);
        client.client = http_client(config.timeout)?;
        Ok(client)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn to_api_messages(conversation: &Conversation) -> Vec<ApiMessage> {
        let mut result: Vec<ApiMessage> = Vec::new();

        for msg in &conversation.messages {
            match msg.role {
                MessageRole::System => {}
                MessageRole::User => result.push(ApiMessage {
                    role: "user",
                    content: ApiContent::Text(msg.content.clone()),
                }),
                MessageRole::Assistant => {
                    let calls = msg.tool_calls.as_deref().unwrap_or_default();
                    if calls.is_empty() {
                        result.push(ApiMessage {
                            role: "assistant",
                            content: ApiContent::Text(msg.content.clone()),
                        });
                        continue;
                    }

                    let mut blocks = Vec::new();
                    if !msg.content.is_empty() {
                        blocks.push(ContentBlock::Text {
                            text: msg.content.clone(),
                        });
                    }
                    blocks.extend(calls.iter().map(|tc| ContentBlock::ToolUse {
                        id: tc.id.clone(),
                        name: tc.name.clone(),
                        input: tc.arguments.clone(),
                    }));
                    result.push(ApiMessage {
                        role: "assistant",
                        content: ApiContent::Blocks(blocks),
                    });
                }
                MessageRole::Tool => {
                    let block = ContentBlock::ToolResult {
                        tool_use_id: msg.tool_call_id.clone().unwrap_or_default(),
                        content: msg.content.clone(),
                        is_error: msg.is_error,
                    };

                    // Results answering the same assistant turn share one user message.
                    if let Some(ApiMessage {
                        role: "user",
                        content: ApiContent::Blocks(blocks),
                    }) = result.last_mut()
                    {
                        blocks.push(block);
                    } else {
                        result.push(ApiMessage {
                            role: "user",
                            content: ApiContent::Blocks(vec![block]),
                        });
                    }
                }
            }
        }

        result
    }

    pub fn build_request(
        &self,
        conversation: &Conversation,
        tools: &[ToolDefinition],
    ) -> Result<Value, LLMError> {
        let tools = if tools.is_empty() {
            None
        } else {
            Some(
                tools
                    .iter()
                    .map(|t| ApiTool {
                        name: &t.name,
                        description: &t.description,
                        input_schema: &t.parameters,
                    })
                    .collect(),
            )
        };

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: Some(conversation.system.as_str()).filter(|s| !s.is_empty()),
            messages: Self::to_api_messages(conversation),
            tools,
            temperature: self.temperature,
        };

        serde_json::to_value(request)
            .map_err(|e| LLMError::ParseError(format!("Failed to serialize request: {}", e)))
    }

    pub fn parse_response(body: &str) -> Result<Decision, LLMError> {
        let response: MessagesResponse = serde_json::from_str(body)
            .map_err(|e| LLMError::ParseError(format!("Failed to parse Anthropic response: {}", e)))?;

        let mut text = String::new();
        let mut calls = Vec::new();

        for block in response.content {
            match block {
                ResponseBlock::Text { text: t } => text.push_str(&t),
                ResponseBlock::ToolUse { id, name, input } => calls.push(ToolCall {
                    id,
                    name,
                    arguments: if input.is_null() {
                        Value::Object(serde_json::Map::new())
                    } else {
                        input
                    },
                }),
                ResponseBlock::Other => {}
            }
        }

        if calls.is_empty() {
            Ok(Decision::FinalAnswer(text))
        } else {
            Ok(Decision::ToolCalls(calls))
        }
    }
}

#[async_trait]
impl ModelGateway for AnthropicClient {
    async fn decide(
        &self,
        conversation: &Conversation,
        tools: &[ToolDefinition],
    ) -> Result<Decision, LLMError> {
        let request = self.build_request(conversation, tools)?;

        debug!(provider = "anthropic", model = %self.model, messages = conversation.messages.len(), "sending messages request");

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        if !(200..300).contains(&status) {
            warn!(status, body = %body, "Anthropic API error");
            return Err(LLMError::from_status(status, body));
        }

        Self::parse_response(&body)
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "anthropic".to_string(),
            name: self.model.clone(),
        }
    }
}
