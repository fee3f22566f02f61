//! Section Content Generator: asks the LLM for the tailored version of one section.

use async_trait::async_trait;
use tracing::debug;

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::optimizer::prompts::{SECTION_PROMPT_TEMPLATE, SECTION_SYSTEM};
use crate::optimizer::walker::{Section, SectionVisitor};

/// Lower bound on the completion budget so short headings are not cut off.
const MIN_MAX_TOKENS: u32 = 64;

/// Rewrites resume sections against a fixed list of job requirements.
pub struct SectionOptimizer<'a> {
    llm: &'a LlmClient,
    requirements: &'a [String],
}

impl<'a> SectionOptimizer<'a> {
    pub fn new(llm: &'a LlmClient, requirements: &'a [String]) -> Self {
        Self { llm, requirements }
    }

    pub async fn optimize(&self, content: &str) -> Result<String, AppError> {
        let prompt = build_prompt(content, self.requirements);
        let response = self
            .llm
            .call(&prompt, SECTION_SYSTEM, Some(max_tokens_for(content)))
            .await
            .map_err(|e| AppError::Generation(format!("Failed to optimize section: {e}")))?;
        debug!("LLM response for section optimization:\n{response}");

        let cleaned = clean_response(&response);
        if cleaned.is_empty() {
            return Err(AppError::Generation(
                "LLM returned no usable text for section".to_string(),
            ));
        }
        Ok(cleaned)
    }
}

#[async_trait]
impl SectionVisitor for SectionOptimizer<'_> {
    async fn visit(&mut self, section: &Section) -> Result<String, AppError> {
        self.optimize(&section.text).await
    }
}

fn build_prompt(content: &str, requirements: &[String]) -> String {
    let bullets = requirements
        .iter()
        .map(|r| format!("- {r}"))
        .collect::<Vec<_>>()
        .join("\n");
    SECTION_PROMPT_TEMPLATE
        .replace("{requirements}", &bullets)
        .replace("{content}", content)
}

/// 1.5 tokens per input word, never below [`MIN_MAX_TOKENS`].
fn max_tokens_for(content: &str) -> u32 {
    let words = content.split_whitespace().count() as u32;
    (words * 3 / 2).max(MIN_MAX_TOKENS)
}

/// Strip code fences and a bare `text` language tag the model may wrap its answer in.
///
/// Line endings are normalized to `\n`, the only line break a rebuilt run can hold.
fn clean_response(response: &str) -> String {
    let normalized = response.replace("\r\n", "\n").replace('\r', "\n");
    let mut text = normalized.trim();
    if text.len() >= 6 && text.starts_with("```") && text.ends_with("```") {
        text = text[3..text.len() - 3].trim();
    }
    let text = match text.split_once('\n') {
        Some((first, rest)) if first.trim() == "text" => rest.trim(),
        None if text == "text" => "",
        _ => text,
    };
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::test_support::ScriptedBackend;
    use crate::llm_client::{LlmError, RetryPolicy};
    use crate::optimizer::walker::SectionKind;

    fn requirements() -> Vec<String> {
        vec!["Rust".to_string(), "Distributed systems".to_string()]
    }

    #[test]
    fn test_prompt_lists_requirements_as_bullets() {
        let prompt = build_prompt("Built services in Go", &requirements());
        assert!(prompt.starts_with("Resume Section:\nBuilt services in Go\n"));
        assert!(prompt.contains("Key Requirements:\n- Rust\n- Distributed systems\n"));
        assert!(prompt.contains("9. Return the optimized section as plain text."));
    }

    #[test]
    fn test_max_tokens_scales_with_words_and_has_floor() {
        assert_eq!(max_tokens_for("Skills"), MIN_MAX_TOKENS);
        let long = "word ".repeat(100);
        assert_eq!(max_tokens_for(&long), 150);
        assert_eq!(max_tokens_for(&"w ".repeat(43)), 64);
    }

    #[test]
    fn test_clean_response_strips_fences_and_text_tag() {
        assert_eq!(clean_response("  Led a team  "), "Led a team");
        assert_eq!(clean_response("```\nLed a team\n```"), "Led a team");
        assert_eq!(clean_response("```text\nLed a team\n```"), "Led a team");
        assert_eq!(clean_response("text\nLed a team"), "Led a team");
        assert_eq!(clean_response("textual analysis"), "textual analysis");
        assert_eq!(clean_response("```"), "```");
        assert_eq!(clean_response("``````"), "");
    }

    #[test]
    fn test_clean_response_normalizes_line_endings() {
        assert_eq!(
            clean_response("```text\r\nLed a team\r\nShipped Rust\rOn call\r\n```"),
            "Led a team\nShipped Rust\nOn call"
        );
    }

    #[tokio::test]
    async fn test_optimize_returns_cleaned_text() {
        let backend = ScriptedBackend::new(vec![Ok("```text\nRust engineer\n```".to_string())]);
        let llm = LlmClient::with_retry_policy(Box::new(backend.clone()), RetryPolicy::immediate());
        let reqs = requirements();
        let optimizer = SectionOptimizer::new(&llm, &reqs);

        assert_eq!(optimizer.optimize("Go engineer").await.unwrap(), "Rust engineer");

        let calls = backend.requests();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].system.as_deref(), Some(SECTION_SYSTEM));
        assert_eq!(calls[0].max_tokens, Some(MIN_MAX_TOKENS));
    }

    #[tokio::test]
    async fn test_empty_response_is_generation_error() {
        let backend = ScriptedBackend::new(vec![Ok("```\n```".to_string())]);
        let llm = LlmClient::with_retry_policy(Box::new(backend), RetryPolicy::immediate());
        let reqs = requirements();
        let optimizer = SectionOptimizer::new(&llm, &reqs);

        let err = optimizer.optimize("Go engineer").await.unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_generation_error() {
        let backend = ScriptedBackend::new(vec![
            Err(LlmError::EmptyContent),
            Err(LlmError::EmptyContent),
            Err(LlmError::EmptyContent),
        ]);
        let llm = LlmClient::with_retry_policy(Box::new(backend), RetryPolicy::immediate());
        let reqs = requirements();
        let mut optimizer = SectionOptimizer::new(&llm, &reqs);

        let section = Section {
            position: 1,
            total: 1,
            kind: SectionKind::Paragraph,
            text: "Go engineer".to_string(),
        };
        let err = optimizer.visit(&section).await.unwrap_err();
        assert!(matches!(err, AppError::Generation(msg) if msg.contains("Failed to optimize section")));
    }
}
