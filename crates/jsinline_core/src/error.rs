use thiserror::Error;

use crate::ast::EditError;
use crate::diagnostics::Span;

/// Conditions that abort the whole transform. Everything recoverable is a
/// [`crate::Diagnostic`] instead.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("inlined function at {}:{} returns without a value", span.start.line, span.start.column)]
    MissingTailExpression { span: Span },
    #[error("cannot prepare insertion point at {}:{}", span.start.line, span.start.column)]
    InsertionFailed { span: Span },
    #[error("gave up after {limit} rewrites; inlined functions may expand into each other forever")]
    ExpansionLimit { limit: usize },
    #[error("invalid inline annotation: {0}")]
    InvalidAnnotation(#[from] regex::Error),
    #[error("tree edit failed: {0}")]
    Edit(#[from] EditError),
}
