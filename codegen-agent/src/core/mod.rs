use crate::clients::{Decision, ModelGateway, ToolCall};
use crate::config::ConfigError;
use crate::memory::{FailureKind, Scratchpad, ScratchpadEntry, ToolOutcome};
use crate::prompts::PromptAssembler;
use crate::tools::ToolRegistry;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(test)]
mod test_helpers;

pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// The user's request, fixed for the lifetime of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task(String);

impl Task {
    pub fn new(input: impl Into<String>) -> Result<Self, ConfigError> {
        let input = input.into();
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyQuery);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// One call at a time, in the order the model listed them.
    #[default]
    Sequential,
    /// All calls of a decision run together; results are still recorded in
    /// request order.
    Concurrent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolErrorPolicy {
    /// Execution failures become observations and the loop continues.
    #[default]
    Observe,
    /// The first execution failure ends the run. Schema failures are still
    /// observed.
    Abort,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub max_iterations: usize,
    pub dispatch: DispatchMode,
    pub on_tool_error: ToolErrorPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            dispatch: DispatchMode::default(),
            on_tool_error: ToolErrorPolicy::default(),
        }
    }
}

impl AgentConfig {
    pub fn with_max_iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..Self::default()
        }
    }
}

/// Terminal outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentResult {
    Success(String),
    BoundedIterationFailure { max_iterations: usize },
    ToolError { tool: String, cause: String },
    GatewayError(String),
}

impl AgentResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AgentResult::Success(_))
    }
}

#[derive(Debug)]
pub enum AgentEvent<'a> {
    Thinking { iteration: usize },
    ToolCompleted { entry: &'a ScratchpadEntry },
    CycleComplete { cycles: usize, scratchpad: &'a Scratchpad },
}

pub type EventCallback = Arc<dyn Fn(&AgentEvent<'_>) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct AgentRun {
    pub result: AgentResult,
    pub scratchpad: Scratchpad,
    pub gateway_calls: usize,
}

/// Drives the think/act cycle for one task at a time.
///
/// The gateway and registry are shared read-only; every call to
/// [`AgentLoop::run`] owns its own scratchpad.
pub struct AgentLoop {
    gateway: Arc<dyn ModelGateway>,
    tools: Arc<ToolRegistry>,
    assembler: PromptAssembler,
    config: AgentConfig,
    on_event: Option<EventCallback>,
}

impl AgentLoop {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        tools: Arc<ToolRegistry>,
        assembler: PromptAssembler,
        config: AgentConfig,
    ) -> Self {
        Self {
            gateway,
            tools,
            assembler,
            config,
            on_event: None,
        }
    }

    pub fn with_event_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&AgentEvent<'_>) + Send + Sync + 'static,
    {
        self.on_event = Some(Arc::new(callback));
        self
    }

    fn emit(&self, event: &AgentEvent<'_>) {
        if let Some(callback) = &self.on_event {
            callback(event);
        }
    }

    pub async fn run(&self, task: &Task) -> AgentRun {
        let definitions = self.tools.definitions();
        let mut scratchpad = Scratchpad::new();
        let mut iteration = 0;
        let mut gateway_calls = 0;

        info!(
            max_iterations = self.config.max_iterations,
            tools = definitions.len(),
            "starting agent run"
        );

        let result = loop {
            if iteration >= self.config.max_iterations {
                warn!(iteration, "iteration budget exhausted without a final answer");
                break AgentResult::BoundedIterationFailure {
                    max_iterations: self.config.max_iterations,
                };
            }

            self.emit(&AgentEvent::Thinking { iteration });
            let conversation = self.assembler.build(task, &scratchpad);

            gateway_calls += 1;
            let decision = match self.gateway.decide(&conversation, &definitions).await {
                Ok(decision) => decision,
                Err(error) => {
                    warn!(iteration, error = %error, "gateway call failed");
                    break AgentResult::GatewayError(error.to_string());
                }
            };

            let calls = match decision {
                Decision::FinalAnswer(text) => {
                    info!(iteration, "final answer received");
                    break AgentResult::Success(text);
                }
                Decision::ToolCalls(calls) => calls,
            };

            debug!(iteration, calls = calls.len(), "dispatching tool calls");
            if let Some(result) = self.act(iteration, calls, &mut scratchpad).await {
                break result;
            }

            iteration += 1;
            self.emit(&AgentEvent::CycleComplete {
                cycles: iteration,
                scratchpad: &scratchpad,
            });
        };

        AgentRun {
            result,
            scratchpad,
            gateway_calls,
        }
    }

    /// Runs one decision's tool calls and appends their entries.
    ///
    /// Returns a terminal result only when the tool error policy says so.
    async fn act(
        &self,
        iteration: usize,
        calls: Vec<ToolCall>,
        scratchpad: &mut Scratchpad,
    ) -> Option<AgentResult> {
        let calls = calls.into_iter().enumerate().map(|(index, mut call)| {
            if call.id.is_empty() {
                call.id = format!("call_{}_{}", iteration, index);
            }
            call
        });

        match self.config.dispatch {
            DispatchMode::Sequential => {
                for call in calls {
                    let entry = self.execute(iteration, call).await;
                    let abort = self.abort_result(&entry);
                    self.record(scratchpad, entry);
                    if abort.is_some() {
                        return abort;
                    }
                }
                None
            }
            DispatchMode::Concurrent => {
                let entries = join_all(calls.map(|call| self.execute(iteration, call))).await;
                let mut abort = None;
                for entry in entries {
                    if abort.is_none() {
                        abort = self.abort_result(&entry);
                    }
                    self.record(scratchpad, entry);
                }
                abort
            }
        }
    }

    async fn execute(&self, iteration: usize, call: ToolCall) -> ScratchpadEntry {
        let result = self.tools.call(&call.name, call.arguments.clone()).await;
        if let Err(error) = &result {
            warn!(tool = %call.name, error = %error, "tool call failed");
        }

        ScratchpadEntry {
            iteration,
            call_id: call.id,
            tool: call.name,
            arguments: call.arguments,
            outcome: result.into(),
        }
    }

    fn abort_result(&self, entry: &ScratchpadEntry) -> Option<AgentResult> {
        match (&entry.outcome, self.config.on_tool_error) {
            (
                ToolOutcome::Failure {
                    kind: FailureKind::Execution,
                    message,
                },
                ToolErrorPolicy::Abort,
            ) => Some(AgentResult::ToolError {
                tool: entry.tool.clone(),
                cause: message.clone(),
            }),
            _ => None,
        }
    }

    fn record(&self, scratchpad: &mut Scratchpad, entry: ScratchpadEntry) {
        scratchpad.push(entry);
        if let Some(entry) = scratchpad.entries().last() {
            self.emit(&AgentEvent::ToolCompleted { entry });
        }
    }
}
