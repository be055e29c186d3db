//! Centralised error hierarchy for the **Rox interpreter**.
//!
//! Two disjoint families live here:
//!
//! * [`LoxError`] covers everything reported *before* execution (scanner,
//!   parser, resolver) plus the driver's I/O failures.  Static phases collect
//!   these instead of aborting, so one run surfaces every problem.
//! * [`RuntimeError`] is the single error that may stop a running program.
//!   Every variant carries the line of the offending token.
//!
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use log::info;

/// Canonical static error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        /// `" at 'lexeme'"`, `" at end"` or empty.
        location: String,
        line: usize,
    },

    /// Static‑analysis failure found by the resolver.
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        location: String,
        line: usize,
    },

    /// Runtime evaluation error that escaped to the top level.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, location: String, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse {
            message,
            location,
            line,
        }
    }

    /// Helper constructor for the **resolver**.  `lexeme` names the token the
    /// error is reported at.
    pub fn resolve<S: Into<String>>(line: usize, lexeme: &str, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", line, message);

        LoxError::Resolve {
            message,
            location: format!(" at '{}'", lexeme),
            line,
        }
    }

    /// Process exit status the driver should use for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoxError::Runtime(_) => 70,
            LoxError::Io(_) => 74,
            _ => 65,
        }
    }
}

/// Errors raised while executing a resolved program.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'.\n[line {line}]")]
    UndefinedVariable { name: String, line: usize },

    /// Bad operand types for arithmetic, negation or ordering.
    #[error("{message}\n[line {line}]")]
    TypeError { message: String, line: usize },

    #[error("Division by zero.\n[line {line}]")]
    DivisionByZero { line: usize },

    #[error("Can only call functions and classes.\n[line {line}]")]
    NotCallable { line: usize },

    #[error("Expected {expected} arguments but got {got}.\n[line {line}]")]
    ArityMismatch {
        expected: usize,
        got: usize,
        line: usize,
    },

    /// Property read on something that is not an instance.
    #[error("Only instances have properties.\n[line {line}]")]
    NotAnInstance { line: usize },

    /// Field write on something that is not an instance.
    #[error("Only instances have fields.\n[line {line}]")]
    NoFields { line: usize },

    #[error("Undefined property '{name}'.\n[line {line}]")]
    UndefinedProperty { name: String, line: usize },

    /// A host-provided native function failed.
    #[error("{message}\n[line {line}]")]
    Native { message: String, line: usize },

    /// Calls nested deeper than the interpreter allows.
    #[error("Stack overflow: more than {depth} nested calls.\n[line {line}]")]
    StackOverflow { depth: usize, line: usize },

    /// The `print` sink could not be written.
    #[error("Output error: {0}")]
    Io(#[from] io::Error),
}

impl RuntimeError {
    /// Shorthand for the most common runtime failure.
    pub fn type_error<S: Into<String>>(line: usize, msg: S) -> Self {
        RuntimeError::TypeError {
            message: msg.into(),
            line,
        }
    }

    /// Line of the token that triggered the error (`0` for output failures).
    pub fn line(&self) -> usize {
        match self {
            RuntimeError::UndefinedVariable { line, .. }
            | RuntimeError::TypeError { line, .. }
            | RuntimeError::DivisionByZero { line }
            | RuntimeError::NotCallable { line }
            | RuntimeError::ArityMismatch { line, .. }
            | RuntimeError::NotAnInstance { line }
            | RuntimeError::NoFields { line }
            | RuntimeError::UndefinedProperty { line, .. }
            | RuntimeError::Native { line, .. }
            | RuntimeError::StackOverflow { line, .. } => *line,
            RuntimeError::Io(_) => 0,
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
