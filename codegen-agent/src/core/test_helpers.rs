//! Scripted gateway used by the agent loop tests.

use crate::clients::{
    Conversation, Decision, LLMError, ModelGateway, ModelInfo, ToolCall, ToolDefinition,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Replays a fixed list of decisions, one per call.
///
/// With a fallback set, the fallback is returned once the script runs out;
/// otherwise running out panics.
pub(crate) struct ScriptedGateway {
    script: Mutex<VecDeque<Result<Decision, LLMError>>>,
    fallback: Option<Decision>,
    calls: AtomicUsize,
    conversations: Mutex<Vec<Conversation>>,
}

impl ScriptedGateway {
    pub(crate) fn new(script: Vec<Result<Decision, LLMError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
            conversations: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn repeating(decision: Decision) -> Self {
        Self {
            fallback: Some(decision),
            ..Self::new(Vec::new())
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every conversation received so far, in call order.
    pub(crate) fn conversations(&self) -> Vec<Conversation> {
        self.conversations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn decide(
        &self,
        conversation: &Conversation,
        _tools: &[ToolDefinition],
    ) -> Result<Decision, LLMError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.conversations.lock().unwrap().push(conversation.clone());

        let next = self.script.lock().unwrap().pop_front();
        match (next, &self.fallback) {
            (Some(step), _) => step,
            (None, Some(decision)) => Ok(decision.clone()),
            (None, None) => panic!("ScriptedGateway: no more responses (call #{})", call),
        }
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "scripted".to_string(),
            name: "scripted".to_string(),
        }
    }
}

pub(crate) fn final_answer(text: &str) -> Decision {
    Decision::FinalAnswer(text.to_string())
}

pub(crate) fn tool_calls(calls: &[(&str, Value)]) -> Decision {
    Decision::ToolCalls(
        calls
            .iter()
            .map(|(name, arguments)| ToolCall::new(*name, arguments.clone()))
            .collect(),
    )
}
