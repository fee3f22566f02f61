//! Requirement Extractor: turns a job description into an ordered list of requirements.

use serde::Deserialize;
use tracing::debug;

use crate::errors::AppError;
use crate::job_posting::prompts::{REQUIREMENTS_PROMPT_TEMPLATE, REQUIREMENTS_SYSTEM};
use crate::llm_client::LlmClient;

/// Models answer either with a bare array or with an object wrapping it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RequirementsPayload {
    List(Vec<String>),
    Wrapped { requirements: Vec<String> },
}

impl RequirementsPayload {
    fn into_vec(self) -> Vec<String> {
        match self {
            RequirementsPayload::List(items) => items,
            RequirementsPayload::Wrapped { requirements } => requirements,
        }
    }
}

pub async fn extract_requirements(
    llm: &LlmClient,
    job_description: &str,
) -> Result<Vec<String>, AppError> {
    let prompt = REQUIREMENTS_PROMPT_TEMPLATE.replace("{job_description}", job_description);
    let payload = llm
        .call_json::<RequirementsPayload>(&prompt, REQUIREMENTS_SYSTEM)
        .await
        .map_err(|e| AppError::Generation(format!("Failed to extract requirements: {e}")))?;

    let requirements = normalize(payload.into_vec());
    debug!("Extracted requirements: {requirements:?}");

    if requirements.is_empty() {
        return Err(AppError::Generation(
            "Failed to extract requirements from LLM response".to_string(),
        ));
    }
    Ok(requirements)
}

/// Trim entries, strip leading list markers (`1.`, `2)`, `-`, `*`), drop blanks.
fn normalize(items: Vec<String>) -> Vec<String> {
    items
        .iter()
        .map(|item| strip_list_marker(item).to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn strip_list_marker(item: &str) -> &str {
    let item = item.trim();
    let after_digits = item.trim_start_matches(|c: char| c.is_ascii_digit());
    let numbered = after_digits.len() < item.len();

    let rest = match after_digits
        .strip_prefix('.')
        .or_else(|| after_digits.strip_prefix(')'))
    {
        // "3.5 years" is content, not a marker
        Some(rest) if numbered && !rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => item,
    };

    rest.trim_start()
        .trim_start_matches(|c: char| matches!(c, '-' | '*' | '\u{2022}'))
        .trim()
}
