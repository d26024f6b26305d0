//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every image leads with its positional index and input file name; what
//! happened to it (dimensions, sizes, quality, output path or error) follows
//! as indented context lines. Items are listed in input order regardless of
//! the order in which the workers finished.
//!
//! # Output Format
//!
//! ## Progress (as items finish)
//!
//! ```text
//! 002 beach.jpg → 1080x1080, 1.95 MB
//! 001 broken.png failed: could not decode image: ...
//! ```
//!
//! ## Report
//!
//! ```text
//! 001 broken.png
//!     Source: photos/broken.png
//!     Error: could not decode image: ...
//! 002 beach.jpg
//!     Source: photos/beach.jpg
//!     1080x1080 JPEG, 3.10 MB → 1.95 MB, quality 0.90 (compressed)
//!     Output: instaframe-out/instagram-beach.jpg
//!
//! Formatted 1 of 2 images
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure, no I/O.

use crate::batch::{BatchOutcome, BatchSummary, ProcessEvent};
use crate::config::FormatterConfig;
use crate::types::ProcessedResult;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Format a 0-based index as a 1-based, 3-digit zero-padded position.
fn format_index(index: usize) -> String {
    format!("{:0>3}", index + 1)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Byte count as MiB with two decimals.
pub fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

fn result_line(result: &ProcessedResult) -> String {
    let mut line = format!(
        "{}x{} {}, {} \u{2192} {}",
        result.width,
        result.height,
        result.format,
        format_mb(result.original_size),
        format_mb(result.processed_size),
    );
    if result.format == crate::types::OutputFormat::Jpeg {
        line.push_str(&format!(", quality {:.2}", result.quality));
    }
    if result.was_compressed {
        line.push_str(" (compressed)");
    }
    line
}

// ============================================================================
// Progress
// ============================================================================

/// Format a single progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Formatted {
            index,
            file_name,
            side,
            processed_size,
            ..
        } => vec![format!(
            "{} {} \u{2192} {side}x{side}, {}",
            format_index(*index),
            file_name,
            format_mb(*processed_size)
        )],
        ProcessEvent::Failed {
            index,
            file_name,
            error,
        } => vec![format!(
            "{} {} failed: {}",
            format_index(*index),
            file_name,
            error
        )],
    }
}

// ============================================================================
// Report
// ============================================================================

/// Format the final report for a batch.
///
/// `written` maps outcome indices to the files saved for them.
pub fn format_batch_output(outcomes: &[BatchOutcome], written: &[(usize, PathBuf)]) -> Vec<String> {
    let mut lines = Vec::new();
    for outcome in outcomes {
        lines.push(format!(
            "{} {}",
            format_index(outcome.index),
            outcome.file_name
        ));
        if let Some(source) = &outcome.source {
            lines.push(format!("{}Source: {}", indent(1), source.display()));
        }
        match &outcome.result {
            Ok(result) => {
                lines.push(format!("{}{}", indent(1), result_line(result)));
                let output = written
                    .iter()
                    .find(|(i, _)| *i == outcome.index)
                    .map(|(_, p)| p);
                if let Some(path) = output {
                    lines.push(format!("{}Output: {}", indent(1), path.display()));
                }
            }
            Err(e) => lines.push(format!("{}Error: {}", indent(1), e)),
        }
    }

    let summary = BatchSummary::from_outcomes(outcomes);
    lines.push(String::new());
    lines.push(format!(
        "Formatted {} of {} {}",
        summary.succeeded,
        summary.total(),
        if summary.total() == 1 { "image" } else { "images" }
    ));
    lines
}

/// Print the batch report to stdout.
pub fn print_batch_output(outcomes: &[BatchOutcome], written: &[(usize, PathBuf)]) {
    for line in format_batch_output(outcomes, written) {
        println!("{}", line);
    }
}

#[derive(Serialize)]
struct ReportEntry<'a> {
    index: usize,
    file_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a ProcessedResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Machine-readable report: one JSON object per input, in input order.
pub fn format_json(
    outcomes: &[BatchOutcome],
    written: &[(usize, PathBuf)],
) -> serde_json::Result<String> {
    let entries: Vec<ReportEntry<'_>> = outcomes
        .iter()
        .map(|o| ReportEntry {
            index: o.index,
            file_name: &o.file_name,
            source: o.source.as_deref(),
            output: written
                .iter()
                .find(|(i, _)| *i == o.index)
                .map(|(_, p)| p.as_path()),
            result: o.result.as_ref().ok(),
            error: o.result.as_ref().err().map(|e| e.to_string()),
        })
        .collect();
    serde_json::to_string_pretty(&entries)
}

// ============================================================================
// Config check
// ============================================================================

/// Format the effective configuration for `instaframe check`.
pub fn format_config_check(config: &FormatterConfig, path: &Path, found: bool) -> Vec<String> {
    let origin = if found { "loaded" } else { "not found, stock defaults" };
    let out = &config.output;
    let enc = &config.encoding;
    let budget = if out.size_limit {
        format!("{} MB", out.max_file_size_mb)
    } else {
        "none".to_string()
    };
    let workers = match config.processing.max_processes {
        Some(n) => n.to_string(),
        None => "auto".to_string(),
    };
    vec![
        format!("Config: {} ({origin})", path.display()),
        format!("{}min_size: {}", indent(1), out.min_size),
        format!("{}quality: {:.2}", indent(1), out.quality),
        format!("{}max_file_size: {budget}", indent(1)),
        format!(
            "{}preserve_original_size: {}",
            indent(1),
            out.preserve_original_size
        ),
        format!("{}shadow: {}", indent(1), out.shadow),
        format!("{}background: {:?}", indent(1), out.background),
        format!("{}file_prefix: {}", indent(1), out.file_prefix),
        format!(
            "{}quality search: {:.2} down to {:.2} in steps of {:.2}",
            indent(1),
            out.quality,
            enc.quality_floor,
            enc.quality_step
        ),
        format!("{}max_canvas_side: {}px", indent(1), enc.max_canvas_side),
        format!("{}max_processes: {workers}", indent(1)),
        "Config OK".to_string(),
    ]
}

/// Print the config check to stdout.
pub fn print_config_check(config: &FormatterConfig, path: &Path, found: bool) {
    for line in format_config_check(config, path, found) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
