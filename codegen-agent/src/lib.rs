pub mod clients;
pub mod config;
pub mod core;
pub mod memory;
pub mod prompts;
pub mod reporter;
pub mod tools;

pub use clients::{
    AnthropicClient, Conversation, Decision, GatewayConfig, LLMError, Message, MessageRole,
    ModelGateway, OpenAIClient, RetryConfig, RetryingGateway, ToolCall, ToolDefinition,
    create_gateway,
};
pub use config::{AppConfig, ConfigError, Overrides, Profile, Provider};
pub use core::{AgentConfig, AgentEvent, AgentLoop, AgentResult, AgentRun, Task};
pub use memory::{Scratchpad, ScratchpadEntry, ToolOutcome};
pub use prompts::PromptAssembler;
pub use reporter::{Report, ResultReporter};
pub use tools::{InputSchema, RegistryError, ToolRegistry, ToolSpec, ToolTrait, toolset};
