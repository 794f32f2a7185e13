//! Centralised error hierarchy for the **Lox runtime**.
//!
//! Every phase (scanner, parser, resolver, interpreter, CLI) converts its
//! failure modes into one of the variants defined here, so the crate can use a
//! single `Result<T>` alias and interoperate with `anyhow` at the binary edge.
//!
//! Static errors (`Lex`, `Parse`, `Resolve`) are *collected* by their phase and
//! reported together; a [`RuntimeError`] stops the running program and is
//! surfaced exactly once.
//!
//! The module **does not** print diagnostics itself.

use std::fmt;
use std::io;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
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
        /// ` at 'lexeme'` or ` at end`.
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

    /// Runtime evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**, located at `token`.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        LoxError::Parse {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **resolver**, located at `token`.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        LoxError::Resolve {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// `true` for errors that must stop a program before it runs.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            LoxError::Lex { .. } | LoxError::Parse { .. } | LoxError::Resolve { .. }
        )
    }
}

fn location_of(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

/// The runtime error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// Bad operand types, non‑class superclass, property access on a non‑instance.
    TypeError,
    UndefinedVariable,
    UndefinedProperty,
    NotCallable,
    ArityMismatch,
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuntimeErrorKind::TypeError => "TypeError",
            RuntimeErrorKind::UndefinedVariable => "UndefinedVariable",
            RuntimeErrorKind::UndefinedProperty => "UndefinedProperty",
            RuntimeErrorKind::NotCallable => "NotCallable",
            RuntimeErrorKind::ArityMismatch => "ArityMismatch",
        };

        f.write_str(name)
    }
}

/// A (kind, message, line) triple raised while evaluating.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}\n[line {line}]")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub message: String,
    pub line: usize,
}

impl RuntimeError {
    pub fn new<S: Into<String>>(kind: RuntimeErrorKind, line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Runtime error: kind={}, line={}, msg={}",
            kind, line, message
        );

        RuntimeError {
            kind,
            message,
            line,
        }
    }

    pub fn type_error<S: Into<String>>(line: usize, msg: S) -> Self {
        Self::new(RuntimeErrorKind::TypeError, line, msg)
    }

    pub fn undefined_variable(name: &str, line: usize) -> Self {
        Self::new(
            RuntimeErrorKind::UndefinedVariable,
            line,
            format!("Undefined variable '{}'.", name),
        )
    }

    pub fn undefined_property(name: &str, line: usize) -> Self {
        Self::new(
            RuntimeErrorKind::UndefinedProperty,
            line,
            format!("Undefined property '{}'.", name),
        )
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
