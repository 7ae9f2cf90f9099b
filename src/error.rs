//! Error types shared by every database backend.
//!
//! Callers are expected to branch on [`DbError::kind`]. Only the first four
//! kinds carry meaning across backends; `Backend` is an opaque passthrough of
//! whatever the native driver reported.

use crate::database::types::{BackendType, Document};
use thiserror::Error;

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, DbError>;

/// Boxed native driver error
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub(crate) const DOCUMENT_NOT_FOUND: &str = "Document not found";
pub(crate) const DOCUMENT_ALREADY_EXISTS: &str = "Document with a key already exists";

/// Error types for database operations
#[derive(Debug, Error)]
pub enum DbError {
    /// Backend unreachable or a command-level fault
    #[error("Connection refused from {backend}")]
    Connection { backend: BackendType },

    /// Uniqueness constraint violated on insert
    #[error("{message}")]
    AlreadyExist { message: String },

    /// Zero documents matched where at least one was required
    #[error("{message}")]
    NotExist { message: String },

    /// Caller-supplied parameter rejected before any I/O
    #[error("{message}")]
    Input { message: String },

    /// The per-call deadline elapsed before the backend answered
    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Document could not be converted to or from the native representation
    #[error("Data conversion error: {0}")]
    Conversion(String),

    /// Unclassified native driver error
    #[error("{backend} error: {source}")]
    Backend {
        backend: BackendType,
        #[source]
        source: BoxError,
    },
}

/// Fieldless discriminant of [`DbError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    AlreadyExist,
    NotExist,
    Input,
    Timeout,
    Conversion,
    Backend,
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Connection { .. } => ErrorKind::Connection,
            DbError::AlreadyExist { .. } => ErrorKind::AlreadyExist,
            DbError::NotExist { .. } => ErrorKind::NotExist,
            DbError::Input { .. } => ErrorKind::Input,
            DbError::Timeout { .. } => ErrorKind::Timeout,
            DbError::Conversion(_) => ErrorKind::Conversion,
            DbError::Backend { .. } => ErrorKind::Backend,
        }
    }

    pub fn not_found() -> Self {
        DbError::NotExist {
            message: DOCUMENT_NOT_FOUND.to_string(),
        }
    }

    pub fn already_exists() -> Self {
        DbError::AlreadyExist {
            message: DOCUMENT_ALREADY_EXISTS.to_string(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        DbError::Input {
            message: message.into(),
        }
    }

    pub fn backend<E>(backend: BackendType, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        DbError::Backend {
            backend,
            source: source.into(),
        }
    }
}

/// Failure of a bulk operation that may have completed part of its work.
///
/// `completed` holds the documents that were written and re-fetched before
/// `error` occurred, in input order. It is empty when nothing is known to have
/// been written.
#[derive(Debug, Error)]
#[error("{error} ({} documents completed)", .completed.len())]
pub struct BulkWriteError {
    pub completed: Vec<Document>,
    #[source]
    pub error: DbError,
}

impl BulkWriteError {
    pub fn new(completed: Vec<Document>, error: DbError) -> Self {
        Self { completed, error }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl From<DbError> for BulkWriteError {
    fn from(error: DbError) -> Self {
        Self {
            completed: Vec::new(),
            error,
        }
    }
}
