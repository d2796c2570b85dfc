#![deny(clippy::unwrap_used)]

//! Source-to-source inliner for a JavaScript subset.
//!
//! Functions carrying a `/** @inline */` doc comment are removed and their bodies pasted at
//! every use; calls of literal closures are then expanded in place, property reads on object
//! literals are resolved, and the bindings this leaves redundant are cleaned up.

mod ast;
mod ast_utils;
mod diagnostics;
mod error;
mod inline_table;
mod lexer;
mod options;
mod parser;
mod passes;
mod printer;
mod purity;
mod scope;
mod transform;

pub use ast::{
    AssignOp, Ast, BinaryOp, DeclKind, EditError, FunctionKind, LogicalOp, Node, NodeId, UnaryOp,
    UpdateOp,
};
pub use diagnostics::{
    diagnostics_have_errors, render_diagnostics, Diagnostic, DiagnosticLabel, DiagnosticSeverity,
    Position, Span,
};
pub use error::TransformError;
pub use options::TransformOptions;
pub use parser::parse_program;
pub use printer::{print_node, print_program};
pub use transform::{transform_program, TransformReport, TransformStats};

/// Result of [`transform_source`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct TransformedSource {
    /// The rewritten program, or the input unchanged when it did not parse.
    pub code: String,
    /// Parse errors, or the findings of the transform.
    pub diagnostics: Vec<Diagnostic>,
    pub stats: TransformStats,
}

/// Parses, transforms and prints `source`. Parse errors are reported as diagnostics and leave
/// the program untouched.
pub fn transform_source(
    source: &str,
    options: &TransformOptions,
) -> Result<TransformedSource, TransformError> {
    let (mut ast, diagnostics) = parse_program(source);
    if diagnostics_have_errors(&diagnostics) {
        return Ok(TransformedSource {
            code: source.to_string(),
            diagnostics,
            stats: TransformStats::default(),
        });
    }
    let report = transform_program(&mut ast, options)?;
    let mut all = diagnostics;
    all.extend(report.diagnostics);
    Ok(TransformedSource {
        code: print_program(&ast),
        diagnostics: all,
        stats: report.stats,
    })
}
