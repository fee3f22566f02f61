use thiserror::Error;

use crate::docx::DocxError;
use crate::llm_client::LlmError;

/// Application-level error type.
///
/// Setup failures (`Fetch`, `TemplateLoad`, `Save`, `Config`) abort the run.
/// `Generation` aborts JSON-dependent calls but is skipped per section by the walker.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to fetch job posting: {0}")]
    Fetch(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Failed to load resume template '{path}': {source}")]
    TemplateLoad {
        path: String,
        #[source]
        source: DocxError,
    },

    #[error("Failed to save document '{path}': {source}")]
    Save {
        path: String,
        #[source]
        source: DocxError,
    },

    #[error("Document structure error: {0}")]
    Document(#[from] DocxError),

    #[error(transparent)]
    StructuralMismatch(#[from] StructuralMismatch),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// A captured snapshot attribute that could not be put back on the rebuilt paragraph.
/// Always recovered locally: the attribute is dropped and the rewrite continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralMismatch {
    #[error("hyperlink relationship '{0}' no longer resolves")]
    StaleHyperlink(String),
}

impl AppError {
    /// Logs the full error chain to the debug log and returns the message shown to the user.
    pub fn report(&self) -> String {
        match self {
            AppError::Fetch(msg) => {
                tracing::error!("Fetch error: {msg}");
                self.to_string()
            }
            AppError::Generation(msg) => {
                tracing::error!("Generation error: {msg}");
                self.to_string()
            }
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e:?}");
                format!("The language model could not complete the request: {e}")
            }
            AppError::TemplateLoad { path, source } => {
                tracing::error!("Template load error for {path}: {source:?}");
                self.to_string()
            }
            AppError::Save { path, source } => {
                tracing::error!("Save error for {path}: {source:?}");
                self.to_string()
            }
            AppError::Document(e) => {
                tracing::error!("Document error: {e:?}");
                self.to_string()
            }
            AppError::StructuralMismatch(e) => {
                tracing::warn!("Structural mismatch: {e}");
                self.to_string()
            }
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {msg}");
                self.to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                self.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_returns_display_message_for_fetch() {
        let err = AppError::Fetch("Job title not found on the page.".to_string());
        assert_eq!(
            err.report(),
            "Failed to fetch job posting: Job title not found on the page."
        );
    }

    #[test]
    fn test_structural_mismatch_is_transparent() {
        let err: AppError = StructuralMismatch::StaleHyperlink("rId9".to_string()).into();
        assert_eq!(err.to_string(), "hyperlink relationship 'rId9' no longer resolves");
    }

    #[test]
    fn test_template_load_mentions_path() {
        let err = AppError::TemplateLoad {
            path: "resume.docx".to_string(),
            source: DocxError::MissingPart("word/document.xml".to_string()),
        };
        let msg = err.report();
        assert!(msg.contains("resume.docx"));
        assert!(msg.contains("word/document.xml"));
    }
}
