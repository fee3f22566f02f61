//! Console output for the user. Diagnostics go to the debug log through `tracing` instead.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use similar::TextDiff;

use crate::errors::AppError;
use crate::optimizer::walker::{ProgressReporter, Section, WalkSummary};

pub fn success(message: &str) {
    println!("✓ {message}");
}

pub fn error(message: &str) {
    eprintln!("✗ {message}");
}

pub fn progress(message: &str) {
    println!("→ {message}");
}

pub fn info(message: &str) {
    println!("ℹ {message}");
}

pub fn warning(message: &str) {
    println!("⚠ {message}");
}

/// Ask a question on stdin. An empty answer yields `default`.
pub fn prompt(question: &str, default: &str) -> Result<String> {
    let mut stdout = io::stdout().lock();
    if default.is_empty() {
        write!(stdout, "{question}: ")?;
    } else {
        write!(stdout, "{question} (default '{default}'): ")?;
    }
    stdout.flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read answer from stdin")?;

    let answer = answer.trim();
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    })
}

pub fn print_requirements(requirements: &[String]) {
    println!("\nKey Requirements:");
    print!("{}", requirements_table(requirements));
}

fn requirements_table(requirements: &[String]) -> String {
    let mut table = format!("{:>4}  {}\n", "No.", "Requirement");
    table.push_str(&format!("{:>4}  {}\n", "----", "-----------"));
    for (i, requirement) in requirements.iter().enumerate() {
        table.push_str(&format!("{:>4}  {}\n", i + 1, requirement));
    }
    table
}

/// A titled box around `body`.
fn panel(title: &str, body: &str) -> String {
    let width = body
        .lines()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .max(title.chars().count() + 2);

    let mut out = format!("┌─ {title} {}┐\n", "─".repeat(width - title.chars().count() - 1));
    for line in body.lines() {
        let pad = width - line.chars().count();
        out.push_str(&format!("│ {line}{} │\n", " ".repeat(pad)));
    }
    out.push_str(&format!("└{}┘\n", "─".repeat(width + 2)));
    out
}

pub fn print_input_output(input: &str, output: &str) {
    print!("{}", panel("Input", input));
    print!("{}", panel("Output", output));
}

/// Unified diff of the two texts, `None` when they have the same lines.
pub fn render_diff(original: &str, adjusted: &str) -> Option<String> {
    if original.lines().eq(adjusted.lines()) {
        return None;
    }
    // Compare line-terminated text so the last line is not flagged as missing a newline.
    let original = format!("{}\n", original.lines().collect::<Vec<_>>().join("\n"));
    let adjusted = format!("{}\n", adjusted.lines().collect::<Vec<_>>().join("\n"));

    let diff = TextDiff::from_lines(&original, &adjusted);
    Some(
        diff.unified_diff()
            .context_radius(3)
            .header("Original", "Adjusted")
            .to_string(),
    )
}

pub fn print_diff(original: &str, adjusted: &str) {
    match render_diff(original, adjusted) {
        Some(diff) => print!("{diff}"),
        None => success("No changes made in this section."),
    }
}

pub fn print_summary(summary: &WalkSummary) {
    if summary.failures.is_empty() {
        success(&format!(
            "{}/{} sections optimized",
            summary.rewritten, summary.total
        ));
        return;
    }
    warning(&format!(
        "{}/{} sections optimized, {} left unchanged after errors",
        summary.rewritten,
        summary.total,
        summary.failures.len()
    ));
    for failure in &summary.failures {
        warning(&format!(
            "  {} {}: {}",
            failure.kind.label(),
            failure.position,
            failure.message
        ));
    }
}

/// Progress reporting on the console for the document walk.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn section_started(&mut self, section: &Section) {
        progress(&format!(
            "Processing {} {}/{}",
            section.kind.label(),
            section.position,
            section.total
        ));
    }

    fn section_rewritten(&mut self, section: &Section, replacement: &str) {
        print_input_output(&section.text, replacement);
        print_diff(&section.text, replacement);
        success(&format!(
            "Section {}/{} optimized successfully",
            section.position, section.total
        ));
    }

    fn section_failed(&mut self, section: &Section, err: &AppError) {
        error(&format!(
            "Error processing {} {}: {err}",
            section.kind.label(),
            section.position
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_text_has_no_diff() {
        assert_eq!(render_diff("Rust engineer", "Rust engineer"), None);
        assert_eq!(render_diff("a\nb", "a\nb\n"), None);
    }

    #[test]
    fn test_diff_has_headers_and_changed_lines() {
        let diff = render_diff("Go engineer\nLed team", "Rust engineer\nLed team").unwrap();

        assert!(diff.starts_with("--- Original\n+++ Adjusted\n"));
        assert!(diff.contains("-Go engineer\n"));
        assert!(diff.contains("+Rust engineer\n"));
        assert!(diff.contains(" Led team\n"));
        assert!(!diff.contains("No newline"));
    }

    #[test]
    fn test_requirements_table_is_numbered() {
        let table = requirements_table(&["Rust".to_string(), "SQL".to_string()]);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines[0], " No.  Requirement");
        assert_eq!(lines[2], "   1  Rust");
        assert_eq!(lines[3], "   2  SQL");
    }

    #[test]
    fn test_panel_pads_every_line_to_same_width() {
        let out = panel("Input", "short\na much longer line");
        let widths: Vec<_> = out.lines().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "{out}");
        assert!(out.starts_with("┌─ Input "));
    }
}
