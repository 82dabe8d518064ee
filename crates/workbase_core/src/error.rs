//! Error taxonomy surfaced by entity lifecycle operations.
//!
//! # Responsibility
//! - Give callers one error type with a stable failure category.
//! - Carry the subject name, offending value and optional inner cause.
//!
//! # Invariants
//! - `DataNotFound` means "legitimately absent", never an infrastructure fault.
//! - Repository faults are always wrapped as `DatabaseOperation`.

use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EntityResult<T> = Result<T, EntityError>;

/// Boxed inner cause kept by [`EntityError`].
pub type ErrorCause = Box<dyn Error + Send + Sync + 'static>;

/// Failure category of an [`EntityError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityErrorKind {
    /// Requested document(s) do not exist.
    DataNotFound,
    /// Input failed reference or structural validation before a write.
    DataValidation,
    /// Persistence backbone fault.
    DatabaseOperation,
    /// Caller-supplied argument is unusable (bad ref, page overflow, no match).
    InvalidArgument,
    /// Requested mutation is not permitted (immutable field, required relation).
    InvalidOperation,
    /// Broken internal contract.
    Unexpected,
}

impl EntityErrorKind {
    /// Stable name used in messages and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataNotFound => "DataNotFoundError",
            Self::DataValidation => "DataValidationError",
            Self::DatabaseOperation => "DatabaseOperationError",
            Self::InvalidArgument => "InvalidArgumentError",
            Self::InvalidOperation => "InvalidOperationError",
            Self::Unexpected => "UnexpectedError",
        }
    }
}

impl Display for EntityErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed failure returned by every entity operation.
#[derive(Debug)]
pub struct EntityError {
    kind: EntityErrorKind,
    subject: String,
    value: Value,
    cause: Option<ErrorCause>,
}

impl EntityError {
    pub fn new(kind: EntityErrorKind, subject: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            value: value.into(),
            cause: None,
        }
    }

    pub fn data_not_found(subject: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(EntityErrorKind::DataNotFound, subject, value)
    }

    pub fn data_validation(subject: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(EntityErrorKind::DataValidation, subject, value)
    }

    pub fn database_operation(subject: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(EntityErrorKind::DatabaseOperation, subject, value)
    }

    pub fn invalid_argument(subject: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(EntityErrorKind::InvalidArgument, subject, value)
    }

    pub fn invalid_operation(subject: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(EntityErrorKind::InvalidOperation, subject, value)
    }

    pub fn unexpected(subject: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(EntityErrorKind::Unexpected, subject, value)
    }

    /// Attaches an inner cause.
    pub fn with_cause(mut self, cause: impl Into<ErrorCause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn kind(&self) -> EntityErrorKind {
        self.kind
    }

    /// Entity, field, relation target or operation name this error is about.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Offending value (id, id list, filter description or payload).
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Inner cause, if one was wrapped.
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Returns the wrapped cause when it is itself an [`EntityError`].
    pub fn entity_cause(&self) -> Option<&EntityError> {
        self.cause
            .as_deref()
            .and_then(|cause| cause.downcast_ref::<EntityError>())
    }

    /// Domain-expected failures that propagate unchanged to callers.
    pub fn is_validation_class(&self) -> bool {
        matches!(
            self.kind,
            EntityErrorKind::DataValidation
                | EntityErrorKind::InvalidOperation
                | EntityErrorKind::InvalidArgument
        )
    }
}

impl Display for EntityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} `{}`", self.kind, self.subject, self.value)?;
        if let Some(cause) = &self.cause {
            write!(f, " ({cause})")?;
        }
        Ok(())
    }
}

impl Error for EntityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn Error + 'static))
    }
}
