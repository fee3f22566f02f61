use std::fmt;

use anyhow::{bail, Context, Result};

/// Fixed output file written to the working directory.
pub const OUTPUT_FILE: &str = "ATS_Resume.docx";
/// Debug log written to the working directory.
pub const LOG_FILE: &str = "debug.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    LmStudio,
    Ollama,
}

impl BackendKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "lmstudio" | "lm-studio" | "lm_studio" => Some(Self::LmStudio),
            "2" | "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Self::LmStudio => 1234,
            Self::Ollama => 11434,
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            Self::LmStudio => "llama-3.2-3b-instruct",
            Self::Ollama => "llama3.2",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LmStudio => f.write_str("LM Studio"),
            Self::Ollama => f.write_str("Ollama"),
        }
    }
}

/// Which inference server to use and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub backend: BackendKind,
    /// Model identifier the server knows the model by
    pub model: String,
    /// LM Studio only: path passed to `lms load` when the model is not loaded yet
    pub model_path: Option<String>,
    pub host: String,
    pub port: u16,
}

impl LlmConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Application configuration.
///
/// Each `LLM_*` variable overrides one setting. When `LLM_BACKEND` is unset the
/// user is asked interactively; otherwise unset settings take their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let llm = LlmConfig::resolve(|key| std::env::var(key).ok(), crate::ui::prompt)?;
        Ok(Config { llm })
    }
}

impl LlmConfig {
    /// `lookup` reads a variable; `ask(question, default)` reads one answer from the user.
    pub fn resolve<L, A>(lookup: L, mut ask: A) -> Result<Self>
    where
        L: Fn(&str) -> Option<String>,
        A: FnMut(&str, &str) -> Result<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let (backend, interactive) = match lookup("LLM_BACKEND") {
            Some(value) => match BackendKind::parse(&value) {
                Some(kind) => (kind, false),
                None => bail!("LLM_BACKEND must be 'lmstudio' or 'ollama', got '{value}'"),
            },
            None => {
                crate::ui::info("Select the LLM server:");
                crate::ui::info("1. LM Studio");
                crate::ui::info("2. Ollama");
                let selection = ask("Enter 1 or 2", "")?;
                match BackendKind::parse(&selection) {
                    Some(kind) => (kind, true),
                    None => bail!("Invalid selection. Please enter 1 or 2."),
                }
            }
        };

        let mut setting = |key: &str, question: &str, default: &str| -> Result<String> {
            match lookup(key) {
                Some(value) => Ok(value),
                None if interactive => {
                    let answer = ask(question, default)?;
                    Ok(if answer.trim().is_empty() {
                        default.to_string()
                    } else {
                        answer.trim().to_string()
                    })
                }
                None => Ok(default.to_string()),
            }
        };

        let model_path = match backend {
            BackendKind::LmStudio => Some(setting(
                "LLM_MODEL_PATH",
                "Enter the LM Studio model path (e.g. 'mlx-community/Llama-3.2-3B-Instruct-4bit')",
                "",
            )?)
            .filter(|p| !p.is_empty()),
            BackendKind::Ollama => None,
        };
        let model = setting(
            "LLM_MODEL",
            &format!("Enter the {backend} model identifier"),
            backend.default_model(),
        )?;
        let host = setting("LLM_HOST", &format!("Enter the {backend} host"), "localhost")?;
        let port = setting(
            "LLM_PORT",
            &format!("Enter the {backend} port"),
            &backend.default_port().to_string(),
        )?;
        let port = port
            .parse::<u16>()
            .with_context(|| format!("Port must be a valid port number, got '{port}'"))?;

        Ok(LlmConfig {
            backend,
            model,
            model_path,
            host,
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn no_prompt(question: &str, _default: &str) -> Result<String> {
        panic!("unexpected prompt: {question}")
    }

    #[test]
    fn test_env_backend_uses_defaults_without_prompting() {
        let config = LlmConfig::resolve(env(&[("LLM_BACKEND", "ollama")]), no_prompt).unwrap();

        assert_eq!(config.backend, BackendKind::Ollama);
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.model_path, None);
        assert_eq!(config.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_env_overrides_every_setting() {
        let config = LlmConfig::resolve(
            env(&[
                ("LLM_BACKEND", "LMStudio"),
                ("LLM_MODEL", "qwen2.5-7b"),
                ("LLM_MODEL_PATH", "Qwen/Qwen2.5-7B-Instruct-GGUF"),
                ("LLM_HOST", "10.0.0.5"),
                ("LLM_PORT", "4321"),
            ]),
            no_prompt,
        )
        .unwrap();

        assert_eq!(config.backend, BackendKind::LmStudio);
        assert_eq!(config.model, "qwen2.5-7b");
        assert_eq!(
            config.model_path.as_deref(),
            Some("Qwen/Qwen2.5-7B-Instruct-GGUF")
        );
        assert_eq!(config.base_url(), "http://10.0.0.5:4321");
    }

    #[test]
    fn test_interactive_selection_with_defaults() {
        let mut answers = vec!["1", "models/llama", "", "", ""].into_iter();
        let mut questions = Vec::new();
        let config = LlmConfig::resolve(env(&[]), |q, _| {
            questions.push(q.to_string());
            Ok(answers.next().unwrap_or_default().to_string())
        })
        .unwrap();

        assert_eq!(config.backend, BackendKind::LmStudio);
        assert_eq!(config.model_path.as_deref(), Some("models/llama"));
        assert_eq!(config.model, "llama-3.2-3b-instruct");
        assert_eq!(config.port, 1234);
        assert_eq!(questions.len(), 5);
    }

    #[test]
    fn test_invalid_selection_is_rejected() {
        let err = LlmConfig::resolve(env(&[]), |_, _| Ok("3".to_string())).unwrap_err();
        assert!(err.to_string().contains("Invalid selection"));

        let err = LlmConfig::resolve(env(&[("LLM_BACKEND", "openai")]), no_prompt).unwrap_err();
        assert!(err.to_string().contains("LLM_BACKEND"));
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let err = LlmConfig::resolve(
            env(&[("LLM_BACKEND", "ollama"), ("LLM_PORT", "eighty")]),
            no_prompt,
        )
        .unwrap_err();
        assert!(err.to_string().contains("valid port"));
    }
}
