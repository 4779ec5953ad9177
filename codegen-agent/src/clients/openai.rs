//! Chat Completions gateway.

use super::{
    Conversation, Decision, GatewayConfig, LLMError, MessageRole, ModelGateway, ModelInfo,
    ToolCall, ToolDefinition, http_client,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAIClient {
    api_key: String,
    model: String,
    temperature: Option<f32>,
    client: reqwest::Client,
    base_url: String,
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    tools: Option<Vec<ChatTool<'a>>>,
    temperature: Option<f32>,
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Option<&'a str>,
    tool_calls: Option<Vec<ChatToolCall<'a>>>,
    tool_call_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ChatToolCall<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    function: ChatFunctionCall<'a>,
}

#[derive(Debug, Serialize)]
struct ChatFunctionCall<'a> {
    name: &'a str,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ChatTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ChatFunction<'a>,
}

#[derive(Debug, Serialize)]
struct ChatFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ChatResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseToolCall {
    #[serde(default)]
    id: String,
    function: ChatResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ChatResponseFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

impl OpenAIClient {
    pub fn new(api_key: String, model: String, base_url: Option<String>) -> Self {
        Self {
            api_key,
            model,
            temperature: None,
            client: reqwest::Client::new(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, LLMError> {
        Ok(Self::new(
            config.api_key.clone(),
            config.model.clone(),
            config.base_url.clone(),
        )
        .with_temperature(config.temperature)
        .with_http_client(http_client(config.timeout)?))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn build_request(
        &self,
        conversation: &Conversation,
        tools: &[ToolDefinition],
    ) -> Result<Value, LLMError> {
        let mut messages = vec![ChatMessage {
            role: "system",
            content: Some(&conversation.system),
            tool_calls: None,
            tool_call_id: None,
        }];

        for msg in &conversation.messages {
            let role = match msg.role {
                MessageRole::System => "system",
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
                MessageRole::Tool => "tool",
            };

            let tool_calls = msg.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|tc| ChatToolCall {
                        id: &tc.id,
                        kind: "function",
                        function: ChatFunctionCall {
                            name: &tc.name,
                            arguments: tc.arguments.to_string(),
                        },
                    })
                    .collect::<Vec<_>>()
            });

            let content = if msg.content.is_empty() && tool_calls.is_some() {
                None
            } else {
                Some(msg.content.as_str())
            };

            messages.push(ChatMessage {
                role,
                content,
                tool_calls,
                tool_call_id: msg.tool_call_id.as_deref(),
            });
        }

        let tools = if tools.is_empty() {
            None
        } else {
            Some(
                tools
                    .iter()
                    .map(|t| ChatTool {
                        kind: "function",
                        function: ChatFunction {
                            name: &t.name,
                            description: &t.description,
                            parameters: &t.parameters,
                        },
                    })
                    .collect(),
            )
        };

        let request = ChatRequest {
            model: &self.model,
            messages,
            tools,
            temperature: self.temperature,
        };

        serde_json::to_value(request)
            .map_err(|e| LLMError::ParseError(format!("Failed to serialize request: {}", e)))
    }

    pub fn parse_response(body: &str) -> Result<Decision, LLMError> {
        let response: ChatResponse = serde_json::from_str(body)
            .map_err(|e| LLMError::ParseError(format!("Failed to parse response: {}", e)))?;

        let message = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| LLMError::ParseError("response contained no choices".to_string()))?;

        match message.tool_calls {
            Some(calls) if !calls.is_empty() => Ok(Decision::ToolCalls(
                calls
                    .into_iter()
                    .map(|tc| ToolCall {
                        id: tc.id,
                        name: tc.function.name,
                        arguments: parse_arguments(tc.function.arguments),
                    })
                    .collect(),
            )),
            _ => Ok(Decision::FinalAnswer(message.content.unwrap_or_default())),
        }
    }
}

/// Arguments arrive as a JSON-encoded string. Anything that does not parse
/// is passed through as a plain string so schema validation reports it.
fn parse_arguments(raw: String) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(serde_json::Map::new());
    }
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

#[async_trait]
impl ModelGateway for OpenAIClient {
    async fn decide(
        &self,
        conversation: &Conversation,
        tools: &[ToolDefinition],
    ) -> Result<Decision, LLMError> {
        let request = self.build_request(conversation, tools)?;

        debug!(provider = "openai", model = %self.model, messages = conversation.messages.len(), "sending chat completion request");

        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        if !(200..300).contains(&status) {
            warn!(status, body = %body, "OpenAI API error");
            return Err(LLMError::from_status(status, body));
        }

        Self::parse_response(&body)
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "openai".to_string(),
            name: self.model.clone(),
        }
    }
}
