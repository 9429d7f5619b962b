//! Custom error types for the common library
//!
//! `DatabaseError` covers pool setup at startup. `StoreError` covers every
//! document store call and keeps the failure kind so callers can tell a
//! missing document from a backend that is temporarily unavailable.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred while bootstrapping the document schema
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Coarse classification of a store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    NotFound,
    Conflict,
    Malformed,
    Transient,
    Permanent,
}

/// Error returned by document store adapters and the repositories above them.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An update targeted a document that does not exist
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// A create-only write hit an existing document
    #[error("document already exists: {collection}/{id}")]
    AlreadyExists { collection: String, id: String },

    /// A stored document could not be decoded into the requested shape
    #[error("malformed document {collection}/{id}: {message}")]
    Malformed {
        collection: String,
        id: String,
        message: String,
    },

    /// A value could not be encoded into a document
    #[error("failed to encode document for {collection}: {message}")]
    Encode { collection: String, message: String },

    /// The backend is unreachable or overloaded; retrying may succeed
    #[error("transient store failure: {0}")]
    Transient(String),

    /// The backend rejected the operation; retrying will not help
    #[error("store failure: {0}")]
    Permanent(String),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn already_exists(collection: &str, id: &str) -> Self {
        Self::AlreadyExists {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn malformed(collection: &str, id: &str, message: impl ToString) -> Self {
        Self::Malformed {
            collection: collection.to_string(),
            id: id.to_string(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> StoreErrorKind {
        match self {
            Self::NotFound { .. } => StoreErrorKind::NotFound,
            Self::AlreadyExists { .. } => StoreErrorKind::Conflict,
            Self::Malformed { .. } | Self::Encode { .. } => StoreErrorKind::Malformed,
            Self::Transient(_) => StoreErrorKind::Transient,
            Self::Permanent(_) => StoreErrorKind::Permanent,
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        self.kind() == StoreErrorKind::Transient
    }
}

impl From<SqlxError> for StoreError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::Io(_)
            | SqlxError::PoolTimedOut
            | SqlxError::PoolClosed
            | SqlxError::WorkerCrashed => StoreError::Transient(err.to_string()),
            SqlxError::Database(db) => match db.code().as_deref() {
                // serialization_failure, deadlock_detected
                Some("40001") | Some("40P01") => StoreError::Transient(err.to_string()),
                _ => StoreError::Permanent(err.to_string()),
            },
            _ => StoreError::Permanent(err.to_string()),
        }
    }
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinguishable() {
        assert_eq!(
            StoreError::not_found("items", "a").kind(),
            StoreErrorKind::NotFound
        );
        assert_eq!(
            StoreError::already_exists("items", "a").kind(),
            StoreErrorKind::Conflict
        );
        assert!(StoreError::Transient("timeout".into()).is_transient());
        assert!(!StoreError::Permanent("denied".into()).is_transient());
    }

    #[test]
    fn pool_timeout_is_transient() {
        let err: StoreError = SqlxError::PoolTimedOut.into();
        assert!(err.is_transient());
    }
}
