//! Error types for compiling and running scripts.

use std::io;

use itertools::Itertools;

/// One lexical or syntax error, anchored at a byte offset in the source.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("offset {offset}: {message}")]
pub struct Diagnostic {
    pub offset: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Errors that stop a script from running at all.
///
/// Lexical errors take precedence: when the scanner reported anything, the
/// syntax errors are left out since they are mostly consequences.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("lexical errors:\n{}", .0.iter().join("\n"))]
    Lexical(Vec<Diagnostic>),
    #[error("syntax errors:\n{}", .0.iter().join("\n"))]
    Syntax(Vec<Diagnostic>),
}

impl CompileError {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CompileError::Lexical(diags) | CompileError::Syntax(diags) => diags,
        }
    }
}

/// Errors raised while running a script. All of them end the run, except
/// that [`NoMatch`](RuntimeError::NoMatch) and
/// [`Ambiguous`](RuntimeError::Ambiguous) are absorbed by the matcher while it
/// is still probing split points.
#[derive(thiserror::Error, Debug)]
pub enum RuntimeError {
    #[error("unbound reference {0}")]
    Unbound(String),
    #[error("no match")]
    NoMatch,
    #[error("ambiguous match")]
    Ambiguous,
    #[error("division by zero")]
    DivisionByZero,
    #[error("send failed")]
    Send(#[source] io::Error),
    #[error("receive failed")]
    Receive(#[source] io::Error),
    #[error("connection closed after \"{}\" without CRLF", .partial.escape_ascii())]
    ClosedMidLine { partial: Vec<u8> },
    #[error("no match \"{}\" != {pattern}", .line.escape_ascii())]
    ReceiveNoMatch { line: Vec<u8>, pattern: String },
    #[error("ambiguous match \"{}\" != {pattern}", .line.escape_ascii())]
    ReceiveAmbiguous { line: Vec<u8>, pattern: String },
    #[error("mismatch \"{}\" != \"{}\"", .line.escape_ascii(), .matched.escape_ascii())]
    ReceiveMismatch { line: Vec<u8>, matched: Vec<u8> },
    #[error("test failed: {source_text}")]
    AssertionFailed { source_text: String },
}

impl RuntimeError {
    /// True for the failures a pattern produces when it does not fit the data
    /// it is matched against.
    pub fn is_match_failure(&self) -> bool {
        matches!(self, RuntimeError::NoMatch | RuntimeError::Ambiguous)
    }
}
