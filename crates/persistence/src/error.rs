//! Error types for the record gateway.
//!
//! Errors are split by where they originate: [`ValidationError`] for problems
//! detected locally while encoding or decoding a record, and the store-facing
//! variants of [`GatewayError`] that wrap a [`ClientError`] after the retry
//! policy has classified it.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::client::ClientError;

/// The primary error type for all gateway operations.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Malformed or missing record data. Never retried.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store understood the request and refused it (conflict, bad request,
    /// not found). Never retried.
    #[error("store rejected {operation}: {source}")]
    StoreRejected {
        operation: &'static str,
        #[source]
        source: ClientError,
    },

    /// Transient failures persisted through every permitted attempt.
    #[error("store unavailable during {operation} after {attempts} attempt(s): {source}")]
    StoreUnavailable {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: ClientError,
    },
}

impl GatewayError {
    /// Returns `true` if the store reported that the document does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GatewayError::StoreRejected {
                source: ClientError::NotFound,
                ..
            }
        )
    }

    /// Returns `true` if the store refused a write because of a stale revision.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            GatewayError::StoreRejected {
                source: ClientError::Conflict(_),
                ..
            }
        )
    }
}

/// Errors raised while validating record data or gateway configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required key is absent from a document, or a required value is empty.
    #[error("invalid record: missing {field}")]
    MissingField { field: &'static str },

    /// A field holds a JSON value of the wrong type.
    #[error("invalid type for {field}: expected {expected}, found {found}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
        found: String,
    },

    /// The gender string is not one of the known variants.
    #[error("invalid gender: {value}")]
    InvalidGender { value: String },

    /// A date field is not an ISO-8601 calendar date.
    #[error("invalid date for {field}: {value}")]
    InvalidDate { field: &'static str, value: String },

    /// The operation needs an id and revision that the record does not carry.
    #[error("{operation} requires a persisted record with an id and revision")]
    MissingIdentity { operation: &'static str },

    /// Gateway or retry configuration is unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::MissingField { field: "category" };
        assert_eq!(err.to_string(), "invalid record: missing category");

        let err = ValidationError::InvalidType {
            field: "available",
            expected: "boolean",
            found: "string".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid type for available: expected boolean, found string"
        );
    }

    #[test]
    fn test_gateway_error_from_validation() {
        let err: GatewayError = ValidationError::MissingIdentity { operation: "update" }.into();
        assert!(matches!(err, GatewayError::Validation(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_and_conflict_helpers() {
        let not_found = GatewayError::StoreRejected {
            operation: "get",
            source: ClientError::NotFound,
        };
        assert!(not_found.is_not_found());
        assert!(!not_found.is_conflict());

        let conflict = GatewayError::StoreRejected {
            operation: "update",
            source: ClientError::Conflict("Document update conflict.".to_string()),
        };
        assert!(conflict.is_conflict());
        assert!(conflict.to_string().starts_with("store rejected update"));
    }

    #[test]
    fn test_unavailable_display_mentions_attempts() {
        let err = GatewayError::StoreUnavailable {
            operation: "create",
            attempts: 3,
            source: ClientError::Unavailable("503 Service Unavailable".to_string()),
        };
        assert!(err.to_string().contains("after 3 attempt(s)"));
    }
}
