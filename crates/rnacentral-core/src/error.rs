//! # Error Module
//!
//! A single error type for everything in the core crate.

use thiserror::Error;

/// Result alias used across `rnacentral-core`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the catalogue, storage and exporters.
#[derive(Debug, Error)]
pub enum Error {
    /// The embedded database failed.
    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),

    /// A stored record could not be (de)serialized.
    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    /// JSON input or output failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A string is not a valid RNAcentral identifier.
    #[error("invalid RNAcentral id: {0}")]
    InvalidUpi(String),

    /// A requested record does not exist.
    #[error("{kind} not found: {key}")]
    NotFound {
        /// Record kind, e.g. "sequence".
        kind: &'static str,
        /// Lookup key.
        key: String,
    },

    /// An input record failed validation.
    #[error("record {index}: {message}")]
    Invalid {
        /// Zero-based position of the record in its input file.
        index: usize,
        /// What was wrong.
        message: String,
    },

    /// Required metadata was missing.
    #[error("missing field `{0}`")]
    MissingField(String),
}

impl Error {
    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Shorthand for [`Error::Invalid`].
    pub fn invalid(index: usize, message: impl Into<String>) -> Self {
        Self::Invalid {
            index,
            message: message.into(),
        }
    }
}

// redb splits its failures into one type per operation. Fold them all into
// `redb::Error` so `?` works on every call site.
macro_rules! from_redb {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Error {
                fn from(err: $ty) -> Self {
                    Self::Storage(err.into())
                }
            }
        )*
    };
}

from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);
