pub const REQUIREMENTS_SYSTEM: &str = "You are an expert technical recruiter. You read job \
    descriptions and list the qualifications a candidate must demonstrate. You MUST respond \
    with valid JSON only.";

/// Placeholder: `{job_description}`
pub const REQUIREMENTS_PROMPT_TEMPLATE: &str = r#"Job Description:
{job_description}

Instructions:
1. Extract the key requirements and qualifications from the job description.
2. Return them as a JSON array of strings, one requirement per entry, most important first.
3. Keep each requirement short and specific (skills, technologies, experience, responsibilities).
4. Do not include any additional text or commentary.
Do not include any additional text, explanations, or code block markers."#;
