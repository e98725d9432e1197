//! Error types for packet-console.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for console operations.
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// No extension is registered under the given dotted path.
    #[error("extension not found: {0}")]
    ExtensionNotFound(String),

    /// An extension was found but producing its namespace fragment failed.
    #[error("extension {path} failed to load: {reason}")]
    ExtensionFailed { path: String, reason: String },

    /// An extension with the same path is already registered.
    #[error("extension already registered: {0}")]
    DuplicateExtension(String),

    /// Session file does not exist.
    #[error("session file not found: {}", .0.display())]
    SessionNotFound(PathBuf),

    /// Session file exists but could not be decoded.
    #[error("cannot read session file {}: {reason}", path.display())]
    SessionCorrupt { path: PathBuf, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Session image encoding error.
    #[error("session encoding error: {0}")]
    Encode(#[from] bincode::Error),

    /// Statement evaluation error.
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Line editor failure.
    #[error("line editor error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}

/// Errors raised while parsing or evaluating console statements.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Statement could not be parsed.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Name is bound neither in the session nor in the global namespace.
    #[error("name '{0}' is not defined")]
    Name(String),

    /// Attribute lookup or assignment failed.
    #[error("'{type_name}' object has no attribute '{attr}'")]
    Attribute { type_name: String, attr: String },

    /// Operation applied to a value of the wrong type.
    #[error("type error: {0}")]
    Type(String),

    /// Failure reported by a native function.
    #[error("{0}")]
    Runtime(String),

    /// Failure at a given line of a script.
    #[error("line {line}: {source}")]
    Script { line: usize, source: Box<EvalError> },
}

impl EvalError {
    pub(crate) fn attribute(type_name: &str, attr: &str) -> Self {
        Self::Attribute {
            type_name: type_name.to_string(),
            attr: attr.to_string(),
        }
    }
}

impl From<ConsoleError> for EvalError {
    fn from(e: ConsoleError) -> Self {
        match e {
            ConsoleError::Eval(inner) => inner,
            other => Self::Runtime(other.to_string()),
        }
    }
}

/// Convenience Result type for console operations.
pub type Result<T> = std::result::Result<T, ConsoleError>;
