// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! The runtime error taxonomy.
//!
//! Every fallible runtime operation returns [`RuntimeError`]. Errors are not
//! catchable in-language; they unwind through the evaluator to the enclosing
//! host call boundary, picking up a source range on the way out.

use core::fmt;
use thiserror::Error;

use crate::location::SourceRange;

/// Which condition phase of a function invocation failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    Pre,
    Post,
}

impl ConditionKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ConditionKind::Pre => "pre",
            ConditionKind::Post => "post",
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error returned from a host callback. Fatal host errors abort the
/// current host frame and are surfaced to the embedder unreclassified.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HostError {
    pub message: String,
    pub fatal: bool,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: false,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: true,
        }
    }
}

/// The kinds of error the runtime raises.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ErrorKind {
    #[error("failed to save object: path {path} in account {address} already stores an object")]
    Overwrite { address: String, path: String },

    #[error("failed to force-cast value: expected type `{expected}`, got `{actual}`")]
    ForceCastTypeMismatch { expected: String, actual: String },

    #[error("dereference failed: {reason}")]
    Dereference { reason: String },

    #[error("overflow")]
    Overflow,

    #[error("underflow")]
    Underflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("{kind}-condition failed{}", message_suffix(.message))]
    Condition {
        kind: ConditionKind,
        message: Option<String>,
    },

    #[error("attachment of type `{attachment}` is already attached")]
    DuplicateAttachment { attachment: String },

    #[error("cannot attach or remove attachments while iterating over them")]
    AttachmentIterationMutation,

    #[error("resource was invalidated by a move or destruction")]
    InvalidatedResource,

    #[error("resource of type `{ty}` was lost: it was moved out and never used")]
    ResourceLoss { ty: String },

    #[error("value of type `{ty}` is non-transferable and cannot be stored or moved")]
    NonTransferableValue { ty: String },

    #[error("member access failed: expected type `{expected}`, got `{actual}`")]
    MemberAccessType { expected: String, actual: String },

    #[error("missing value for member `{name}`")]
    MissingMemberValue { name: String },

    #[error("index {index} is out of bounds (size {size})")]
    IndexOutOfBounds { index: i64, size: usize },

    #[error("{kind} limit of {limit} exceeded")]
    LimitExceeded { kind: String, limit: u64 },

    #[error("invalid path `{text}`")]
    InvalidPath { text: String },

    #[error(transparent)]
    Host(#[from] HostError),

    /// Raised when the evaluator encounters a program shape the external
    /// checker is required to reject. Indicates a defective checked input.
    #[error("unexpected program state: {message}")]
    Unexpected { message: String },
}

fn message_suffix(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {message}"),
        None => String::new(),
    }
}

/// A runtime error: a kind, the source range it was raised at, and an
/// optional causal chain (e.g. the storage error underneath a failed
/// capability borrow).
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub range: SourceRange,
    cause: Option<Box<RuntimeError>>,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            range: SourceRange::NONE,
            cause: None,
        }
    }

    pub fn at(kind: ErrorKind, range: SourceRange) -> Self {
        Self {
            kind,
            range,
            cause: None,
        }
    }

    /// Stamps `range` onto the error if it does not carry one yet. Used by
    /// the evaluator as errors unwind past located nodes.
    pub fn with_range(mut self, range: SourceRange) -> Self {
        if self.range.is_none() {
            self.range = range;
        }
        self
    }

    pub fn caused_by(mut self, cause: RuntimeError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn cause(&self) -> Option<&RuntimeError> {
        self.cause.as_deref()
    }

    /// Whether this error originated from a fatal host callback failure.
    pub fn is_fatal_host_error(&self) -> bool {
        matches!(&self.kind, ErrorKind::Host(host) if host.fatal)
    }
}

impl From<ErrorKind> for RuntimeError {
    fn from(kind: ErrorKind) -> Self {
        RuntimeError::new(kind)
    }
}

impl From<HostError> for RuntimeError {
    fn from(error: HostError) -> Self {
        RuntimeError::new(ErrorKind::Host(error))
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.range.is_none() {
            write!(f, " (at {})", self.range)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, "\n  caused by: {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_range_keeps_first_stamp() {
        let error = RuntimeError::new(ErrorKind::Overflow)
            .with_range(SourceRange::line(3))
            .with_range(SourceRange::line(9));
        assert_eq!(error.range, SourceRange::line(3));
    }

    #[test]
    fn test_condition_message_rendering() {
        let failed = ErrorKind::Condition {
            kind: ConditionKind::Pre,
            message: Some("amount must be positive".into()),
        };
        assert_eq!(
            failed.to_string(),
            "pre-condition failed: amount must be positive",
        );
        let bare = ErrorKind::Condition {
            kind: ConditionKind::Post,
            message: None,
        };
        assert_eq!(bare.to_string(), "post-condition failed");
    }

    #[test]
    fn test_causal_chain() {
        let inner = RuntimeError::new(ErrorKind::DivisionByZero);
        let outer = RuntimeError::new(ErrorKind::Condition {
            kind: ConditionKind::Pre,
            message: None,
        })
        .caused_by(inner.clone());
        assert_eq!(outer.cause(), Some(&inner));
    }

    #[test]
    fn test_fatal_host_error() {
        let error: RuntimeError = HostError::fatal("event sink unavailable").into();
        assert!(error.is_fatal_host_error());
        let error: RuntimeError = HostError::new("soft").into();
        assert!(!error.is_fatal_host_error());
    }
}
