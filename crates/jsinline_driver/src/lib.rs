#![deny(clippy::unwrap_used)]

use std::fs;
use std::io::IsTerminal;
use std::path::Path;
use std::time::Instant;

use jsinline_core::{
    diagnostics_have_errors, parse_program, print_program, render_diagnostics, transform_program,
    Diagnostic, TransformError, TransformOptions, TransformStats,
};
use serde::Serialize;

fn trace_timing() -> bool {
    std::env::var("JSINLINE_TRACE_TIMING").is_ok_and(|v| v == "1")
}

macro_rules! timing_step {
    ($trace:expr, $label:expr, $block:expr) => {{
        let _t0 = if $trace { Some(Instant::now()) } else { None };
        let result = $block;
        if let Some(t0) = _t0 {
            eprintln!(
                "[JSINLINE_TIMING] {:24} {:>8.1}ms",
                $label,
                t0.elapsed().as_secs_f64() * 1000.0
            );
        }
        result
    }};
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Diagnostics emitted")]
    Diagnostics,
    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),
    #[error("Invalid arguments: {0}")]
    Usage(String),
}

/// Reads transform options from a TOML file. Missing keys keep their defaults.
pub fn load_options(path: &Path) -> Result<TransformOptions, DriverError> {
    let text = fs::read_to_string(path)?;
    toml::from_str(&text).map_err(|err| DriverError::Config(format!("{}: {err}", path.display())))
}

/// One transformed file.
#[derive(Debug, Clone, Serialize)]
pub struct TransformOutput {
    pub path: String,
    /// Rewritten program; the input text when it did not parse.
    pub code: String,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: TransformStats,
}

impl TransformOutput {
    pub fn has_errors(&self) -> bool {
        diagnostics_have_errors(&self.diagnostics)
    }
}

/// Parses, transforms and prints `source`. Parse errors come back as diagnostics with the text
/// untouched; only fatal transform conditions are errors.
pub fn transform_text(
    path: &str,
    source: &str,
    options: &TransformOptions,
) -> Result<TransformOutput, DriverError> {
    let trace = trace_timing();
    let (mut ast, mut diagnostics) = timing_step!(trace, "parse", parse_program(source));
    if diagnostics_have_errors(&diagnostics) {
        return Ok(TransformOutput {
            path: path.to_string(),
            code: source.to_string(),
            diagnostics,
            stats: TransformStats::default(),
        });
    }
    let report = timing_step!(trace, "transform", transform_program(&mut ast, options)?);
    let code = timing_step!(trace, "print", print_program(&ast));
    diagnostics.extend(report.diagnostics);
    Ok(TransformOutput {
        path: path.to_string(),
        code,
        diagnostics,
        stats: report.stats,
    })
}

pub fn transform_file(
    path: &Path,
    options: &TransformOptions,
) -> Result<TransformOutput, DriverError> {
    let source = fs::read_to_string(path)?;
    transform_text(&path.display().to_string(), &source, options)
}

/// Prints rendered diagnostics to stderr, coloured when stderr is a terminal.
pub fn emit_diagnostics(path: &str, source: Option<&str>, diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    let use_color = std::io::stderr().is_terminal();
    let rendered = render_diagnostics(path, source, diagnostics, use_color);
    if !rendered.is_empty() {
        eprintln!("{rendered}");
    }
}

/// The JSON document `--diagnostics-json` prints.
pub fn diagnostics_json(output: &TransformOutput) -> Result<String, DriverError> {
    Ok(serde_json::to_string_pretty(output)?)
}
