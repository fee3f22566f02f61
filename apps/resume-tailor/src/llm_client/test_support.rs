//! Scripted in-process backend for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::llm_client::{CompletionRequest, LlmBackend, LlmError};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub max_tokens: Option<u32>,
}

/// Replays queued answers in order and records every request. Clones share state.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    answers: Arc<Mutex<VecDeque<Result<String, LlmError>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ScriptedBackend {
    pub fn new(answers: Vec<Result<String, LlmError>>) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers.into())),
            requests: Arc::default(),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            prompt: request.prompt.to_string(),
            system: request.system.map(str::to_string),
            max_tokens: request.max_tokens,
        });
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted answer left for prompt: {}", request.prompt))
    }
}
