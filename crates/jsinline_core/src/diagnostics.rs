use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

impl DiagnosticSeverity {
    fn label(self) -> &'static str {
        match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
        }
    }
}

/// One-based line and column of a source character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Synthesized nodes carry the default span; it never points into a source file.
    pub fn is_synthetic(&self) -> bool {
        self.start.line == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticLabel {
    pub message: String,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub code: String,
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub span: Span,
    pub labels: Vec<DiagnosticLabel>,
}

impl Diagnostic {
    pub fn error(code: &str, message: impl Into<String>, span: Span) -> Self {
        Self::new(code, DiagnosticSeverity::Error, message.into(), span)
    }

    pub fn warning(code: &str, message: impl Into<String>, span: Span) -> Self {
        Self::new(code, DiagnosticSeverity::Warning, message.into(), span)
    }

    fn new(code: &str, severity: DiagnosticSeverity, message: String, span: Span) -> Self {
        Self {
            code: code.to_string(),
            severity,
            message,
            span,
            labels: Vec::new(),
        }
    }

    pub fn with_label(mut self, message: impl Into<String>, span: Span) -> Self {
        self.labels.push(DiagnosticLabel {
            message: message.into(),
            span,
        });
        self
    }
}

pub fn diagnostics_have_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics
        .iter()
        .any(|diag| diag.severity == DiagnosticSeverity::Error)
}

// ANSI color codes
const RED: &str = "\x1b[1;31m";
const YELLOW: &str = "\x1b[1;33m";
const CYAN: &str = "\x1b[1;36m";
const DARK_GRAY: &str = "\x1b[90m";
const WHITE: &str = "\x1b[97m";
const RESET: &str = "\x1b[0m";

struct Palette {
    accent: &'static str,
    muted: &'static str,
    text: &'static str,
    note: &'static str,
    reset: &'static str,
}

impl Palette {
    fn new(use_color: bool, severity: DiagnosticSeverity) -> Self {
        if !use_color {
            return Self {
                accent: "",
                muted: "",
                text: "",
                note: "",
                reset: "",
            };
        }
        Self {
            accent: match severity {
                DiagnosticSeverity::Error => RED,
                DiagnosticSeverity::Warning => YELLOW,
            },
            muted: DARK_GRAY,
            text: WHITE,
            note: CYAN,
            reset: RESET,
        }
    }
}

/// Renders diagnostics for one file. `source` enables the caret frames; without it only the
/// headers and notes are printed.
pub fn render_diagnostics(
    path: &str,
    source: Option<&str>,
    diagnostics: &[Diagnostic],
    use_color: bool,
) -> String {
    diagnostics
        .iter()
        .map(|diagnostic| render_diagnostic(path, source, diagnostic, use_color))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_diagnostic(
    path: &str,
    source: Option<&str>,
    diagnostic: &Diagnostic,
    use_color: bool,
) -> String {
    let p = Palette::new(use_color, diagnostic.severity);
    let start = diagnostic.span.start;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}{}[{}]{} {}{}:{}:{}{}",
        p.accent,
        diagnostic.severity.label(),
        diagnostic.code,
        p.reset,
        p.muted,
        path,
        start.line,
        start.column,
        p.reset
    );
    let _ = writeln!(out, "  {}{}{}", p.text, diagnostic.message, p.reset);
    if let Some(source) = source.filter(|_| !diagnostic.span.is_synthetic()) {
        out.push_str(&source_frame(source, &diagnostic.span, &p));
    }
    for label in &diagnostic.labels {
        let pos = label.span.start;
        let _ = writeln!(
            out,
            "{}note{}: {} at {}{}:{}:{}{}",
            p.note, p.reset, label.message, p.muted, path, pos.line, pos.column, p.reset
        );
        if let Some(source) = source.filter(|_| !label.span.is_synthetic()) {
            out.push_str(&source_frame(source, &label.span, &p));
        }
    }
    out.trim_end().to_string()
}

fn source_frame(source: &str, span: &Span, p: &Palette) -> String {
    let Some(line) = span
        .start
        .line
        .checked_sub(1)
        .and_then(|index| source.lines().nth(index))
    else {
        return String::new();
    };
    let line_no = span.start.line;
    let width = line_no.to_string().len();
    let line_len = line.chars().count();
    let start_col = span.start.column.clamp(1, line_len + 1);
    let end_col = if span.end.line == span.start.line {
        span.end.column.clamp(start_col, line_len.max(start_col))
    } else {
        line_len.max(start_col)
    };
    let carets = "^".repeat(end_col - start_col + 1);
    let padding = " ".repeat(start_col - 1);
    let mut out = String::new();
    let _ = writeln!(out, "{}{:>width$} |{}", p.muted, "", p.reset);
    let _ = writeln!(out, "{}{line_no:>width$} |{} {line}", p.muted, p.reset);
    let _ = writeln!(
        out,
        "{}{:>width$} |{} {padding}{}{carets}{}",
        p.muted, "", p.reset, p.accent, p.reset
    );
    out
}
