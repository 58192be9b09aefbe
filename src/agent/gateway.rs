//! Model gateway - one logical provider call with quota-aware retry

use std::time::Duration;

use tracing::{debug, warn};

use crate::tools::ToolDefinition;
use crate::Result;

use super::llm::{GenerationParams, LlmClient, ModelResponse};
use super::message::Message;

/// Retry schedule for throttled provider calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Sleep before retry `k` (1-based): `base_delay * 2^(k-1)`.
    pub fn delay_before_retry(&self, k: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(k.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Outcome of a gateway call
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Response(ModelResponse),
    /// Every attempt was throttled
    Saturated,
}

/// Wraps an [`LlmClient`] with the retry policy
pub struct ModelGateway<C: LlmClient> {
    client: C,
    policy: RetryPolicy,
}

impl<C: LlmClient> ModelGateway<C> {
    pub fn new(client: C) -> Self {
        Self::with_policy(client, RetryPolicy::default())
    }

    pub fn with_policy(client: C, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    /// Call the provider, retrying only on quota errors.
    ///
    /// Fatal errors return immediately as `Err`; quota exhaustion after
    /// the last attempt becomes [`Generation::Saturated`].
    pub async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        params: &GenerationParams,
    ) -> Result<Generation> {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.client.generate(messages, tools, params).await {
                Ok(response) => {
                    debug!("Provider answered on attempt {}", attempt);
                    return Ok(Generation::Response(response));
                }
                Err(e) if e.is_transient_quota() => {
                    if attempt == max_attempts {
                        warn!("Provider still throttled after {} attempts", attempt);
                        break;
                    }
                    let delay = self.policy.delay_before_retry(attempt);
                    warn!("{}. Retrying in {:?} (attempt {}/{})", e, delay, attempt + 1, max_attempts);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Generation::Saturated)
    }
}
