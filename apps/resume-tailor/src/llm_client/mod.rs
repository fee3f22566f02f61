/// LLM Client: the single point of entry for all model calls in resume-tailor.
///
/// ARCHITECTURAL RULE: No other module may talk to an inference server directly.
/// All LLM interactions MUST go through `LlmClient`, which owns retry and JSON repair.
///
/// The server itself is pluggable through `LlmBackend` (LM Studio or Ollama).
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

pub mod backends;
pub mod prompts;

#[cfg(test)]
pub mod test_support;

use prompts::{JSON_ONLY_SYSTEM, JSON_REPAIR_PROMPT_TEMPLATE};

/// Total parse attempts for a JSON call, the first answer included.
const MAX_JSON_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Gave up after {retries} attempts")]
    RetriesExhausted { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM returned invalid JSON after {attempts} attempts: {message}")]
    InvalidJson { attempts: u32, message: String },

    #[error("Model load failed: {0}")]
    ModelLoad(String),
}

impl LlmError {
    /// Transport failures, rate limiting, server errors and empty answers are worth retrying.
    fn is_transient(&self) -> bool {
        match self {
            LlmError::Http(_) | LlmError::EmptyContent => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// One completion request as handed to a backend.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    pub system: Option<&'a str>,
    pub max_tokens: Option<u32>,
}

/// An inference server that can complete a prompt.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the trimmed completion text; empty output is `LlmError::EmptyContent`.
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError>;
}

/// Attempt budget and exponential backoff between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based): base, 2×base, 4×base… capped at `max_delay`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// The single LLM client used by all services in resume-tailor.
pub struct LlmClient {
    backend: Box<dyn LlmBackend>,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(backend: Box<dyn LlmBackend>) -> Self {
        Self::with_retry_policy(backend, RetryPolicy::default())
    }

    pub fn with_retry_policy(backend: Box<dyn LlmBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Completes `prompt`, retrying transient failures with exponential backoff.
    /// An empty `system` sends no system message.
    pub async fn call(
        &self,
        prompt: &str,
        system: &str,
        max_tokens: Option<u32>,
    ) -> Result<String, LlmError> {
        let request = CompletionRequest {
            prompt,
            system: (!system.is_empty()).then_some(system),
            max_tokens,
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt);
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self.backend.complete(&request).await {
                Ok(text) if text.trim().is_empty() => {
                    warn!("{} returned empty content", self.backend.name());
                    last_error = Some(LlmError::EmptyContent);
                }
                Ok(text) => {
                    debug!(
                        "LLM call succeeded on attempt {} ({} chars)",
                        attempt + 1,
                        text.len()
                    );
                    return Ok(text);
                }
                Err(e) if e.is_transient() => {
                    warn!("{} call failed: {e}", self.backend.name());
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(LlmError::RetriesExhausted {
            retries: self.retry.max_attempts,
        }))
    }

    /// Calls the LLM and deserializes the answer as JSON.
    ///
    /// When the answer does not parse, the model is shown its own output and
    /// the parser error and asked for a corrected version. After
    /// `MAX_JSON_ATTEMPTS` unparseable answers the call fails with `InvalidJson`.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let mut output = self.call(prompt, system, None).await?;
        let mut attempts = 1;

        loop {
            let error = match serde_json::from_str::<T>(strip_json_fences(&output)) {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            warn!("JSON attempt {attempts}/{MAX_JSON_ATTEMPTS} did not parse: {error}");
            debug!("Unparseable LLM output:\n{output}");

            if attempts >= MAX_JSON_ATTEMPTS {
                return Err(LlmError::InvalidJson {
                    attempts,
                    message: error.to_string(),
                });
            }
            attempts += 1;

            let repair = JSON_REPAIR_PROMPT_TEMPLATE
                .replace("{error}", &error.to_string())
                .replace("{output}", &output);
            output = self.call(&repair, JSON_ONLY_SYSTEM, None).await?;
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
