//! Explicit retry policy for gateway calls.
//!
//! The agent loop treats every gateway error as final; retrying transient
//! failures happens here, and only as far as [`RetryConfig`] allows.

use super::{Conversation, Decision, LLMError, ModelGateway, ModelInfo, ToolDefinition};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.max(1.0).powi(attempt.saturating_sub(1) as i32);
        let delay = self.initial_delay.as_secs_f32() * factor;
        Duration::from_secs_f32(delay.min(self.max_delay.as_secs_f32()))
    }
}

pub struct RetryingGateway<G> {
    inner: G,
    config: RetryConfig,
}

impl<G: ModelGateway> RetryingGateway<G> {
    pub fn new(inner: G, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: ModelGateway> ModelGateway for RetryingGateway<G> {
    async fn decide(
        &self,
        conversation: &Conversation,
        tools: &[ToolDefinition],
    ) -> Result<Decision, LLMError> {
        let mut attempt = 0;
        loop {
            match self.inner.decide(conversation, tools).await {
                Ok(decision) => {
                    if attempt > 0 {
                        debug!(attempts = attempt + 1, "gateway call succeeded after retry");
                    }
                    return Ok(decision);
                }
                Err(error) if error.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.config.delay_for(attempt);
                    warn!(attempt, error = %error, ?delay, "gateway call failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn model_info(&self) -> ModelInfo {
        self.inner.model_info()
    }
}
