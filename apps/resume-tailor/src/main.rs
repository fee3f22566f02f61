mod config;
mod docx;
mod errors;
mod job_posting;
mod llm_client;
mod optimizer;
mod ui;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{BackendKind, Config, LlmConfig, LOG_FILE, OUTPUT_FILE};
use crate::docx::ResumeDocument;
use crate::errors::AppError;
use crate::job_posting::{extract_requirements, JobPostingFetcher};
use crate::llm_client::backends::{LmStudioBackend, ModelStatus, OllamaBackend};
use crate::llm_client::{LlmBackend, LlmClient};
use crate::optimizer::SectionOptimizer;
use crate::ui::ConsoleReporter;

const ENV_HELP: &str = "\
Environment (also read from .env):
  LLM_BACKEND     lmstudio or ollama; when set, the interactive setup prompts are skipped
  LLM_MODEL       model identifier
  LLM_MODEL_PATH  model path for `lms load` (LM Studio)
  LLM_HOST        server host (default localhost)
  LLM_PORT        server port (default 1234 for LM Studio, 11434 for Ollama)
  RUST_LOG        filter for debug.log";

/// Tailor a DOCX resume template to a job posting with a local LLM.
///
/// The result is written to ATS_Resume.docx in the working directory.
#[derive(Debug, Parser)]
#[command(name = "resume-tailor", version, after_help = ENV_HELP)]
struct Cli {
    /// Resume template (.docx)
    template: PathBuf,
    /// Job posting URL
    job_url: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    // load .env if present; ignore if missing
    dotenvy::dotenv().ok();

    if let Err(e) = init_logging() {
        ui::error(&format!("Failed to initialize logging: {e:#}"));
        return ExitCode::from(1);
    }
    info!("Starting resume-tailor v{}", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::error(&e.report());
            ExitCode::from(1)
        }
    }
}

/// Structured logging to `debug.log`, `RUST_LOG` overriding the default filter.
fn init_logging() -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)
        .with_context(|| format!("could not open {LOG_FILE}"))?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{}=debug", env!("CARGO_CRATE_NAME")))),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()?;
    Ok(())
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = Config::from_env().map_err(|e| AppError::Config(format!("{e:#}")))?;
    info!("Configuration: {:?}", config.llm);

    let llm = connect_llm(&config.llm).await?;
    info!("LLM client initialized (backend: {})", llm.backend_name());

    ui::progress("Analyzing job posting...");
    let fetcher = JobPostingFetcher::new()?;
    let posting = fetcher.fetch(&cli.job_url).await?;
    info!(
        "Fetched '{}' ({:?}, {} chars)",
        posting.title,
        posting.source,
        posting.description.len()
    );
    ui::success(&format!("Job posting analyzed: {}", posting.title));

    ui::progress("Extracting requirements...");
    let requirements = extract_requirements(&llm, &posting.description).await?;
    ui::success(&format!("Found {} key requirements", requirements.len()));
    ui::print_requirements(&requirements);

    ui::progress("Loading resume template...");
    let mut document =
        ResumeDocument::open(&cli.template).map_err(|source| AppError::TemplateLoad {
            path: cli.template.display().to_string(),
            source,
        })?;
    ui::success("Resume template loaded");

    ui::progress("Optimizing resume sections...");
    ui::info("Incorporating key requirements into resume sections...");
    let sections = optimizer::count_sections(&document)?;
    info!("Template has {sections} non-blank sections");
    let mut section_optimizer = SectionOptimizer::new(&llm, &requirements);
    let mut reporter = ConsoleReporter;
    let summary =
        optimizer::for_each_section(&mut document, &mut section_optimizer, &mut reporter).await?;
    ui::print_summary(&summary);

    ui::progress("Saving optimized resume...");
    document
        .save(OUTPUT_FILE)
        .map_err(|source| AppError::Save {
            path: OUTPUT_FILE.to_string(),
            source,
        })?;
    ui::success(&format!("Resume saved as: {OUTPUT_FILE}"));
    info!("Saved {OUTPUT_FILE}");

    Ok(())
}

async fn connect_llm(config: &LlmConfig) -> Result<LlmClient, AppError> {
    let backend: Box<dyn LlmBackend> = match config.backend {
        BackendKind::LmStudio => {
            let backend = LmStudioBackend::new(config)?;
            ui::progress(&format!("Checking model '{}'...", backend.model()));
            match backend.ensure_model_loaded().await? {
                ModelStatus::AlreadyLoaded => {
                    ui::info(&format!("Model '{}' is already loaded.", backend.model()))
                }
                ModelStatus::Loaded => {
                    ui::success(&format!("Model '{}' loaded successfully.", backend.model()))
                }
            }
            Box::new(backend)
        }
        BackendKind::Ollama => Box::new(OllamaBackend::new(config)?),
    };
    Ok(LlmClient::new(backend))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_takes_template_and_url() {
        let cli = Cli::try_parse_from(["resume-tailor", "resume.docx", "https://example.com/job"])
            .unwrap();
        assert_eq!(cli.template, PathBuf::from("resume.docx"));
        assert_eq!(cli.job_url, "https://example.com/job");

        assert!(Cli::try_parse_from(["resume-tailor", "resume.docx"]).is_err());
    }

    #[test]
    fn test_help_lists_environment_overrides() {
        let help = Cli::command().render_help().to_string();
        for var in ["LLM_BACKEND", "LLM_MODEL", "LLM_MODEL_PATH", "LLM_HOST", "LLM_PORT"] {
            assert!(help.contains(var), "{var} missing from help");
        }
    }
}
