//! Error taxonomy shared by the stores and services.

use thiserror::Error;

use crate::TagId;

/// Result alias used throughout the service layer.
pub type Result<T, E = ServiceError> = std::result::Result<T, E>;

/// Coarse classification of a [`ServiceError`].
///
/// Callers map these to user-facing feedback (for example HTTP 404/409/400/500).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidArgument,
    Storage,
}

/// Errors raised by the tag hierarchy, document and category services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The entity is absent, or soft-deleted where a live entity was required.
    #[error("{entity} with id {id} was not found")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness rule was violated.
    #[error("a {entity} with {field} '{value}' already exists")]
    Conflict {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// Bad pagination bounds, cyclic or self parent assignment, malformed input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The stored parent chain loops without involving the tag being assigned.
    #[error("tag hierarchy is corrupt: parent chain revisits tag {tag_id}")]
    CorruptHierarchy { tag_id: TagId },

    /// Underlying persistence failure.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(entity: &'static str, field: &'static str, value: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            field,
            value: value.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Returns the error's kind.
    ///
    /// A corrupt hierarchy is an integrity failure of the store and reports
    /// [`ErrorKind::Storage`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::CorruptHierarchy { .. } | Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// True for errors caused by the caller's input rather than the store.
    pub fn is_user_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Storage)
    }
}

/// Returns true when the rusqlite error is a UNIQUE constraint violation.
///
/// The partial unique indexes back up the services' explicit checks; a write that
/// races past a check surfaces here and is reported as a conflict.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
