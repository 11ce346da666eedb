//! Compile-time errors produced by the IR builder and code emitter.
//!
//! Grounded on the teacher's `bytecode::compiler::CompileError`: a single closed error type
//! carrying a source span, surfaced as one failure rather than a list of partial
//! diagnostics (the compiler never attempts partial output - see spec §7).

use ruff_text_size::TextRange;
use thiserror::Error;

/// A single compile-time failure, with the source span it occurred at.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unknown name `{name}` referenced")]
    UnknownName { name: String, span: TextRange },

    #[error("annotation `{name}` does not name a known type")]
    UnknownType { name: String, span: TextRange },

    #[error("cannot assign a value of category {from} to `{name}`, declared {to}, without a defined coercion")]
    IncompatibleAssignment {
        name: String,
        from: crate::category::Category,
        to: crate::category::Category,
        span: TextRange,
    },

    #[error("method call on `{name}` requires a boxed receiver; it has scalar category {category}")]
    MethodCallOnScalar {
        name: String,
        category: crate::category::Category,
        span: TextRange,
    },

    #[error("`raise {name}` references an exception type that was never declared")]
    UndeclaredExceptionType { name: String, span: TextRange },

    #[error("class `{name}` is used as a parameter annotation before it is declared")]
    ClassUsedBeforeDeclaration { name: String, span: TextRange },

    #[error("`{name}` uses a parameter form this dialect's fixed-arity calling convention does not support: {detail}")]
    UnsupportedParameterForm { name: String, detail: &'static str, span: TextRange },

    #[error("internal invariant violated: {message}")]
    Internal { message: String },
}

impl CompileError {
    /// The source span this error occurred at, when one is available.
    ///
    /// `Internal` errors are invariant violations caught by the emitter's own structural
    /// bookkeeping (e.g. an NLR checkpoint that would leak) rather than a malformed source
    /// program, so they carry no user-facing span.
    #[must_use]
    pub fn span(&self) -> Option<TextRange> {
        match self {
            Self::UnknownName { span, .. }
            | Self::UnknownType { span, .. }
            | Self::IncompatibleAssignment { span, .. }
            | Self::MethodCallOnScalar { span, .. }
            | Self::UndeclaredExceptionType { span, .. }
            | Self::ClassUsedBeforeDeclaration { span, .. }
            | Self::UnsupportedParameterForm { span, .. } => Some(*span),
            Self::Internal { .. } => None,
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
