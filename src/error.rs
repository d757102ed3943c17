use std::fmt;

use thiserror::Error;

/// Errors that can occur outside of an invocation envelope.
///
/// Everything that happens *during* a pipeline run is reported through the
/// [`Envelope`](crate::Envelope) instead; these errors only cover setting a
/// pipeline up.
#[derive(Debug, Error)]
pub enum Error {
    /// The script could not be turned into a callable
    #[error(transparent)]
    Compilation(#[from] CompilationError),
    /// A configuration document could not be parsed
    #[error("Invalid pipeline configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// A pipeline stage refused to let the request continue.
///
/// Rejections short-circuit every later stage. The `message` is part of the
/// external contract and is copied verbatim into the error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct Rejection {
    /// The stage that rejected the request
    pub kind: RejectionKind,
    /// Human-readable message returned to the caller
    pub message: String,
}

impl Rejection {
    /// Creates a new rejection.
    pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a rejection raised by the envelope validator.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(RejectionKind::Validation, message)
    }

    /// Creates a rejection raised by the authorizer.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(RejectionKind::Authorization, message)
    }
}

/// The kind of pipeline rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// The script failed to compile
    Compilation,
    /// The request body failed structural validation
    Validation,
    /// The bearer credential was missing or wrong
    Authorization,
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionKind::Compilation => write!(f, "CompilationError"),
            RejectionKind::Validation => write!(f, "ValidationError"),
            RejectionKind::Authorization => write!(f, "AuthorizationError"),
        }
    }
}

/// Failure reported by a [`ScriptCompiler`](crate::ScriptCompiler).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("CompilationError: {message}")]
pub struct CompilationError {
    /// What the compiler reported
    pub message: String,
}

impl CompilationError {
    /// Creates a new compilation error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<CompilationError> for Rejection {
    fn from(err: CompilationError) -> Self {
        Rejection::new(RejectionKind::Compilation, err.message)
    }
}
