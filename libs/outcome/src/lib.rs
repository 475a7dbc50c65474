//! Shared result type for every shortreel service operation.
//!
//! All public operations return [`Outcome<T>`] instead of raising foreign
//! error types across component boundaries. Backend-native failures are
//! translated once, at the storage boundary, into one of the five
//! [`ErrorKind`]s; everything unclassified becomes `Internal`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A required field is missing or malformed.
    BadRequest,
    /// Password mismatch or an invalid internal token.
    Forbidden,
    /// A referenced entity does not exist.
    NotFound,
    /// Duplicate key or content mismatch on write.
    Conflict,
    /// Backend-level failure not otherwise classified.
    Internal,
}

impl ErrorKind {
    /// Fixed translation table for store-native status codes.
    /// 200 maps to no error at all, so it is not represented here.
    pub fn from_status(status: u16) -> Option<ErrorKind> {
        match status {
            200 => None,
            404 => Some(ErrorKind::NotFound),
            409 => Some(ErrorKind::Conflict),
            _ => Some(ErrorKind::Internal),
        }
    }
}

/// Error carried by every failed [`Outcome`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Result alias used by every service, storage, cache and blob operation.
pub type Outcome<T> = Result<T, Error>;

/// Storage-boundary translation of sqlx failures.
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Error::not_found("row not found"),
            sqlx::Error::Database(db) => {
                // 23505 unique_violation, 23503 foreign_key_violation
                match db.code().as_deref() {
                    Some("23505") | Some("23503") => Error::conflict(db.to_string()),
                    _ => Error::internal(db.to_string()),
                }
            }
            other => Error::internal(other.to_string()),
        }
    }
}
