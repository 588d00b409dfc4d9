// src/error.rs

//! Error types for the validator.
//!
//! The walk distinguishes two failure kinds statically: a [`ValidationError`]
//! (a malformed tree, produced by a bug in an earlier pass) and a
//! [`ValidatorFault`] (the validator itself could not finish). Only the first
//! is enriched into a [`CompilerBug`] report at the entry point.

use miette::{Diagnostic, LabeledSpan, SourceCode};
use std::fmt;
use thiserror::Error;

use crate::ast::Node;

/// A local grammar violation, pointing at the offending subtree.
#[derive(Debug, Clone)]
pub struct ValidationError<'a> {
    pub node: Option<&'a Node>,
    pub message: String,
}

impl<'a> ValidationError<'a> {
    pub fn new(node: &'a Node, message: impl Into<String>) -> Self {
        ValidationError {
            node: Some(node),
            message: message.into(),
        }
    }

    /// True when the offending node is exactly `node` (by identity).
    pub fn is_at(&self, node: &Node) -> bool {
        self.node.is_some_and(|n| std::ptr::eq(n, node))
    }
}

impl fmt::Display for ValidationError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(node) => write!(f, "{} ({})", self.message, node.name()),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ValidationError<'_> {}

/// The validator could not complete its walk.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ValidatorFault {
    #[error("parse tree nesting depth {depth} exceeds the validator limit of {limit}")]
    #[diagnostic(
        code(midtier::validator::too_deep),
        help("raise `ValidatorConfig::max_depth` (or `--max-depth`) if the tree is legitimately this deep")
    )]
    NestingTooDeep { depth: usize, limit: usize },
}

/// Result of the internal walk.
#[derive(Debug)]
pub enum WalkError<'a> {
    Invalid(ValidationError<'a>),
    Fault(ValidatorFault),
}

impl<'a> From<ValidationError<'a>> for WalkError<'a> {
    fn from(err: ValidationError<'a>) -> Self {
        WalkError::Invalid(err)
    }
}

impl From<ValidatorFault> for WalkError<'_> {
    fn from(fault: ValidatorFault) -> Self {
        WalkError::Fault(fault)
    }
}

/// A validation failure enriched with a location and the rendered tree.
///
/// Always a bug in the compiler, never a user error.
#[derive(Debug, Clone, Error)]
#[error("Parse tree validation failure '{message}' at {location}:\n\n{rendered}\n")]
pub struct CompilerBug {
    pub message: String,
    /// `line:column` of the offending node, else of the root, else `(unknown)`.
    pub location: String,
    /// The whole tree, line-numbered, with the offending node marked.
    pub rendered: String,
    /// Byte range of the highlighted lines inside `rendered`.
    pub highlight: Option<(usize, usize)>,
}

impl Diagnostic for CompilerBug {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new("midtier::validation"))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(
            "a transformation pass produced a malformed tree; this is a compiler bug",
        ))
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.rendered)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let (start, len) = self.highlight?;
        let label = LabeledSpan::new(Some(self.message.clone()), start, len.max(1));
        Some(Box::new(std::iter::once(label)))
    }
}

/// Error returned by [`crate::semantics::validator::validate`].
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum ValidateError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    CompilerBug(#[from] CompilerBug),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Internal(#[from] ValidatorFault),
}
