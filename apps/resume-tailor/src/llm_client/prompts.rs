// Shared prompt constants for LLM calls.
// Each module that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Sent when a JSON answer fails to parse. Placeholders: `{error}`, `{output}`.
pub const JSON_REPAIR_PROMPT_TEMPLATE: &str = r#"Your previous answer was not valid JSON.

Parser error:
{error}

Previous answer:
{output}

Return the same content as valid JSON only. Keep the structure that was requested originally.
Do not include any additional text, explanations, or code block markers."#;
