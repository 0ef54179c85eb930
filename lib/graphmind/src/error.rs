//! The error taxonomy: one kind per enum variant, each carrying
//! a stable machine-readable tag (the variant name) and a human message, and
//! none carrying a dynamic backtrace as part of its identity so assertions on
//! error kinds stay stable across refactors.

use std::fmt;
use thiserror::Error;

/// A position in a parsed document, used by [`ParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Malformed Turtle/N-Triples/N-Quads/SPARQL input.
///
/// Surfaced synchronously, before any side effect: a document that fails to
/// parse leaves the store exactly as it was.
#[derive(Debug, Error)]
#[error("parse error at {position}: {message}")]
pub struct ParseError {
    pub position: Position,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            position: Position { line, column },
            message: message.into(),
        }
    }
}

/// A dictionary lookup of an unknown id. Always a bug, always surfaced.
#[derive(Debug, Error)]
#[error("invalid dictionary id: {0}")]
pub struct InvalidId(pub u64);

/// A construct the engine recognizes but deliberately does not execute (e.g.
/// `SERVICE`, SPARQL Update). Carries the offending construct's name.
#[derive(Debug, Error)]
#[error("unsupported feature: {0}")]
pub struct UnsupportedFeature(pub String);

/// `max_rows` or `path_depth_limit` was exceeded; partial results were
/// discarded.
#[derive(Debug, Error)]
#[error("cardinality limit exceeded: {0}")]
pub struct CardinalityLimit(pub String);

/// A Datalog rule is not range-restricted, or its head introduces a variable
/// unbound by the body. Surfaced at program validation time, before any
/// evaluation round runs.
#[derive(Debug, Error)]
#[error("rule shape error: {0}")]
pub struct RuleShapeError(pub String);

/// Cooperative cancellation fired.
#[derive(Debug, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// An internal consistency failure (e.g. a dangling dictionary reference in
/// the quad index). Fatal for the operation in progress; the caller may
/// retry after rebuilding the store.
#[derive(Debug, Error)]
#[error("invariant violation: {0}")]
pub struct InvariantViolation(pub String);

/// The union of every error kind this crate can raise outside of row-level
/// SPARQL evaluation (which is absorbed locally, per SPARQL semantics, and
/// never reaches this type).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GraphmindError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    InvalidId(#[from] InvalidId),
    #[error(transparent)]
    UnsupportedFeature(#[from] UnsupportedFeature),
    #[error(transparent)]
    CardinalityLimit(#[from] CardinalityLimit),
    #[error(transparent)]
    RuleShape(#[from] RuleShapeError),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}
