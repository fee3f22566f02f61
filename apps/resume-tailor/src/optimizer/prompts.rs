/// System message shared by every section rewrite in a run.
pub const SECTION_SYSTEM: &str = "You are an expert resume optimizer. Ensure that all responses are \
    accurate, factual, and adhere strictly to the instructions provided. Do not include any \
    information that is not present in the input. Your goal is to enhance the resume sections by \
    incorporating relevant keywords from the key requirements, without increasing the length of \
    the content. Do not add any emojis to the text. If the original text contains emojis, keep \
    them, but do not introduce new ones.";

/// Placeholders: `{content}`, `{requirements}` (one `- ` bullet per line).
pub const SECTION_PROMPT_TEMPLATE: &str = r#"Resume Section:
{content}

Key Requirements:
{requirements}

Instructions:
1. Review the section and enhance it by incorporating relevant keywords and phrases from the key requirements if appropriate.
2. Do not remove or summarize any existing content; only make necessary adjustments to better match the job requirements.
3. Ensure that all original details are preserved exactly as they are.
4. If the section is already optimized or no changes are needed, leave it unchanged.
5. Keep the output length similar to the input length; do not exceed the original length.
6. Do not include any boolean values; all content should be text.
7. Preserve special characters and emojis in the text.
8. Do not add any emojis to the text. If the original text contains emojis, keep them, but do not introduce new ones.
9. Return the optimized section as plain text.
Do not include any additional text, explanations, or code block markers."#;
