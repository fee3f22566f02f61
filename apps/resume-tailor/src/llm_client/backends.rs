//! HTTP backends for local inference servers.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::LlmConfig;
use crate::llm_client::{CompletionRequest, LlmBackend, LlmError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_MAX_TOKENS: u32 = 512;
const SEED: u64 = 42;

const MODEL_LOAD_POLL: Duration = Duration::from_secs(5);
const MODEL_LOAD_TIMEOUT: Duration = Duration::from_secs(600);

fn http_client() -> Result<Client, LlmError> {
    Ok(Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

/// Turns a non-2xx response into `LlmError::Api` carrying the body.
async fn check_status(response: Response) -> Result<Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    error!("Inference server returned {status}: {body}");
    Err(LlmError::Api {
        status: status.as_u16(),
        message: body,
    })
}

// ---------------------------------------------------------------------------
// LM Studio
// ---------------------------------------------------------------------------

/// LM Studio's OpenAI-style `/v1/completions` endpoint.
pub struct LmStudioBackend {
    client: Client,
    base_url: String,
    model: String,
    model_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct LmStudioRequest<'a> {
    model: &'a str,
    prompt: String,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    stream: bool,
    seed: u64,
}

#[derive(Debug, Deserialize)]
struct LmStudioResponse {
    #[serde(default)]
    choices: Vec<LmStudioChoice>,
}

#[derive(Debug, Deserialize)]
struct LmStudioChoice {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// Whether `ensure_model_loaded` had to load the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    AlreadyLoaded,
    Loaded,
}

impl LmStudioBackend {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client()?,
            base_url: config.base_url(),
            model: config.model.clone(),
            model_path: config.model_path.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn model_is_loaded(&self) -> Result<bool, LlmError> {
        let response = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        let models: ModelList = serde_json::from_str(&body)?;
        Ok(models.data.iter().any(|m| m.id == self.model))
    }

    /// Make sure the server has the model under our identifier, loading it with `lms` if not.
    ///
    /// Polls every 5 s until `lms load` exits or the model shows up, for at most 10 minutes.
    pub async fn ensure_model_loaded(&self) -> Result<ModelStatus, LlmError> {
        if self.model_is_loaded().await? {
            info!("Model '{}' is already loaded", self.model);
            return Ok(ModelStatus::AlreadyLoaded);
        }

        let path = self.model_path.as_deref().ok_or_else(|| {
            LlmError::ModelLoad(format!(
                "model '{}' is not loaded and no model path was provided to load it",
                self.model
            ))
        })?;

        info!(
            "Loading model '{path}' with identifier '{}' via lms",
            self.model
        );
        let child = Command::new("lms")
            .args(["load", path, "--identifier", self.model.as_str()])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LlmError::ModelLoad(format!("failed to start 'lms load': {e}")))?;

        let output = child.wait_with_output();
        tokio::pin!(output);
        let deadline = tokio::time::sleep(MODEL_LOAD_TIMEOUT);
        tokio::pin!(deadline);
        let mut poll = tokio::time::interval(MODEL_LOAD_POLL);
        poll.tick().await;

        loop {
            tokio::select! {
                result = &mut output => {
                    let output = result
                        .map_err(|e| LlmError::ModelLoad(format!("'lms load' did not complete: {e}")))?;
                    if !output.status.success() {
                        error!("lms load exited with {}", output.status);
                        error!("stdout: {}", String::from_utf8_lossy(&output.stdout));
                        error!("stderr: {}", String::from_utf8_lossy(&output.stderr));
                        return Err(LlmError::ModelLoad(format!(
                            "failed to load model '{}' in LM Studio ({})",
                            self.model, output.status
                        )));
                    }
                    info!("Model '{}' loaded", self.model);
                    return Ok(ModelStatus::Loaded);
                }
                _ = poll.tick() => {
                    if self.model_is_loaded().await? {
                        info!("Model '{}' is now available", self.model);
                        return Ok(ModelStatus::Loaded);
                    }
                    info!("Waiting for the model to load...");
                }
                _ = &mut deadline => {
                    return Err(LlmError::ModelLoad(format!(
                        "model '{}' was not available after {} s",
                        self.model,
                        MODEL_LOAD_TIMEOUT.as_secs()
                    )));
                }
            }
        }
    }

    fn build_request<'a>(&'a self, request: &CompletionRequest<'_>) -> LmStudioRequest<'a> {
        // /v1/completions has no system role; the system message leads the prompt.
        let prompt = match request.system {
            Some(system) => format!("{system}\n\n{}", request.prompt),
            None => request.prompt.to_string(),
        };
        LmStudioRequest {
            model: &self.model,
            prompt,
            temperature: 0.0,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            top_p: 0.1,
            frequency_penalty: 0.5,
            presence_penalty: 0.5,
            stream: false,
            seed: SEED,
        }
    }
}

fn parse_lmstudio_response(body: &str) -> Result<String, LlmError> {
    let response: LmStudioResponse = serde_json::from_str(body)?;
    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.text.trim().to_string())
        .ok_or(LlmError::EmptyContent)
}

#[async_trait]
impl LlmBackend for LmStudioBackend {
    fn name(&self) -> &str {
        "LM Studio"
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let payload = self.build_request(request);
        debug!(
            "Sending payload to /v1/completions: {}",
            serde_json::to_string_pretty(&payload)?
        );

        let response = self
            .client
            .post(format!("{}/v1/completions", self.base_url))
            .bearer_auth("lm-studio")
            .json(&payload)
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        debug!("LM Studio response: {body}");

        parse_lmstudio_response(&body)
    }
}

// ---------------------------------------------------------------------------
// Ollama
// ---------------------------------------------------------------------------

/// Ollama's `/api/generate` endpoint, non-streaming.
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

impl OllamaBackend {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client()?,
            base_url: config.base_url(),
            model: config.model.clone(),
        })
    }

    fn build_request<'a>(&'a self, request: &CompletionRequest<'a>) -> OllamaRequest<'a> {
        OllamaRequest {
            model: &self.model,
            prompt: request.prompt,
            system: request.system,
            stream: false,
            options: OllamaOptions {
                temperature: 0.0,
                seed: SEED,
                num_predict: request.max_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let payload = self.build_request(request);
        debug!(
            "Sending payload to /api/generate: {}",
            serde_json::to_string_pretty(&payload)?
        );

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&payload)
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        debug!("Ollama response: {body}");

        let parsed: OllamaResponse = serde_json::from_str(&body)?;
        Ok(parsed.response.trim().to_string())
    }
}
