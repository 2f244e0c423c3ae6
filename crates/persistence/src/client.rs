//! Document store client abstraction.
//!
//! [`DocumentStoreClient`] is the seam between the gateway and a concrete
//! transport. The gateway never talks HTTP itself; it hands encoded documents
//! to a client and interprets the [`ClientError`] that comes back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::Selector;

/// A wire document: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

/// Store response to a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    /// Whether the store acknowledged the write.
    #[serde(default)]
    pub ok: bool,
    /// Id of the written document.
    pub id: String,
    /// Revision assigned by the store.
    pub rev: String,
}

/// One row of an all-documents listing.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRow {
    /// Document id.
    pub id: String,
    /// Current revision.
    pub rev: String,
    /// Document body, present when bodies were requested.
    pub doc: Option<Document>,
}

/// Failures reported by a document store client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The database or document does not exist.
    #[error("not found")]
    NotFound,

    /// The revision supplied does not match the stored one.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request was malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Credentials were missing or refused.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The service asked the caller to slow down.
    #[error("throttled: {0}")]
    Throttled(String),

    /// The service reported an internal or availability failure.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The request never produced a response (connect failure, timeout).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The response could not be interpreted.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Any other unexpected status.
    #[error("unexpected status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Reason reported by the store.
        message: String,
    },
}

impl ClientError {
    /// Returns `true` if retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Throttled(_) | ClientError::Unavailable(_) | ClientError::Transport(_) => {
                true
            }
            ClientError::Status { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }
}

/// Document-level operations against a named database.
///
/// Implementations must be safe to share between tasks; the gateway holds one
/// behind an `Arc` for its whole lifetime.
#[async_trait]
pub trait DocumentStoreClient: Send + Sync {
    /// Creates or updates a document. A document carrying `_id` (and `_rev`)
    /// updates that document; one without `_id` is created with a store-assigned id.
    async fn post_document(
        &self,
        database: &str,
        document: &Document,
    ) -> Result<WriteResult, ClientError>;

    /// Fetches a document by id. Absence is [`ClientError::NotFound`].
    async fn get_document(&self, database: &str, id: &str) -> Result<Document, ClientError>;

    /// Deletes a document at the given revision.
    async fn delete_document(
        &self,
        database: &str,
        id: &str,
        rev: &str,
    ) -> Result<WriteResult, ClientError>;

    /// Lists every document in the database in store order (ascending id).
    async fn list_all_documents(
        &self,
        database: &str,
        include_docs: bool,
    ) -> Result<Vec<DocumentRow>, ClientError>;

    /// Returns all documents matching an equality selector, in store order.
    async fn find(&self, database: &str, selector: &Selector)
    -> Result<Vec<Document>, ClientError>;

    /// Checks whether a database exists.
    async fn database_exists(&self, database: &str) -> Result<bool, ClientError>;

    /// Creates a database.
    async fn create_database(&self, database: &str) -> Result<(), ClientError>;
}
