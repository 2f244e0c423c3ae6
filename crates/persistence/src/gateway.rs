//! The record gateway: CRUD and queries over a document store.
//!
//! [`RecordGateway`] composes the [`RecordCodec`], the [`RetryPolicy`] and an
//! injected [`DocumentStoreClient`]. It holds no mutable state; the store's
//! revision check is the only concurrency control.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use recordstore_persistence::backends::memory::InMemoryDocumentStore;
//! use recordstore_persistence::types::Record;
//! use recordstore_persistence::{RecordGateway, RetryPolicy};
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryDocumentStore::with_databases(&["pets"]);
//! let gateway = RecordGateway::new(Arc::new(store), "pets", RetryPolicy::no_retry());
//!
//! let mut fido = Record::new("Fido").with_category("dog");
//! let id = gateway.create(&mut fido).await?;
//!
//! let loaded = gateway.find_by_id(&id).await?.expect("just created");
//! assert_eq!(loaded.name, "Fido");
//! # Ok::<(), recordstore_persistence::GatewayError>(())
//! # }).unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::client::{ClientError, Document, DocumentStoreClient};
use crate::codec::RecordCodec;
use crate::error::{GatewayError, GatewayResult};
use crate::retry::RetryPolicy;
use crate::types::{Gender, Record, Selector};

/// Persistence gateway for [`Record`]s stored in one database.
#[derive(Clone)]
pub struct RecordGateway {
    client: Arc<dyn DocumentStoreClient>,
    database: String,
    retry: RetryPolicy,
}

impl fmt::Debug for RecordGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordGateway")
            .field("database", &self.database)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl RecordGateway {
    /// Creates a gateway over `database` using an already-connected client.
    pub fn new(
        client: Arc<dyn DocumentStoreClient>,
        database: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            database: database.into(),
            retry,
        }
    }

    /// Name of the backing database.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Retry policy applied to every store call.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn store(&self) -> (&dyn DocumentStoreClient, &str) {
        (self.client.as_ref(), self.database.as_str())
    }

    /// Persists a new record and assigns its id and revision.
    ///
    /// # Errors
    ///
    /// * `GatewayError::Validation` - if `name` is empty
    /// * `GatewayError::StoreRejected` - if the store refuses the document
    /// * `GatewayError::StoreUnavailable` - if transient failures outlast the retry policy
    pub async fn create(&self, record: &mut Record) -> GatewayResult<String> {
        record.validate()?;
        let document = &RecordCodec::encode(record);
        let (client, database) = self.store();

        let result = self
            .retry
            .execute("create", move || client.post_document(database, document))
            .await?;

        record.id = Some(result.id.clone());
        record.revision = Some(result.rev);
        info!(id = %result.id, "Created record");
        Ok(result.id)
    }

    /// Writes the record's current data over its stored document.
    ///
    /// The record must carry the revision last returned by the store; a stale
    /// revision is rejected by the store as a conflict.
    pub async fn update(&self, record: &mut Record) -> GatewayResult<()> {
        record.identity("update")?;
        record.validate()?;
        let document = &RecordCodec::encode(record);
        let (client, database) = self.store();

        let result = self
            .retry
            .execute("update", move || client.post_document(database, document))
            .await?;

        info!(id = %result.id, rev = %result.rev, "Updated record");
        record.revision = Some(result.rev);
        Ok(())
    }

    /// Deletes the stored document at the record's revision.
    pub async fn delete(&self, record: &Record) -> GatewayResult<()> {
        let (id, rev) = record.identity("delete")?;
        let (client, database) = self.store();

        self.retry
            .execute("delete", move || client.delete_document(database, id, rev))
            .await?;

        info!(id = %id, "Deleted record");
        Ok(())
    }

    /// Loads a record by id. Returns `None` if the store has no such document.
    ///
    /// Only a not-found response is mapped to `None`; every other failure is
    /// returned as an error. A blank id names no document and is `None`
    /// without a store call.
    pub async fn find_by_id(&self, id: &str) -> GatewayResult<Option<Record>> {
        if id.trim().is_empty() {
            debug!("Blank record id");
            return Ok(None);
        }
        debug!(id = %id, "Finding record");
        let (client, database) = self.store();

        let document = match self
            .retry
            .execute("find_by_id", move || client.get_document(database, id))
            .await
        {
            Ok(document) => document,
            Err(err) if err.is_not_found() => {
                debug!(id = %id, "Record not found");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        Ok(Some(RecordCodec::decode(&document)?))
    }

    /// Loads every record in store listing order.
    ///
    /// A document that fails to decode fails the whole call.
    pub async fn find_all(&self) -> GatewayResult<Vec<Record>> {
        let (client, database) = self.store();
        let rows = self
            .retry
            .execute("find_all", move || client.list_all_documents(database, true))
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let document = row.doc.ok_or_else(|| GatewayError::StoreRejected {
                operation: "find_all",
                source: ClientError::Malformed(format!("row {} has no document body", row.id)),
            })?;
            records.push(RecordCodec::decode(&document)?);
        }
        Ok(records)
    }

    /// Loads every record whose fields equal the selector's values.
    pub async fn find_by(&self, selector: &Selector) -> GatewayResult<Vec<Record>> {
        debug!(selector = ?selector, "Finding records by selector");

        let (client, database) = self.store();
        let documents = self
            .retry
            .execute("find_by", move || client.find(database, selector))
            .await?;

        decode_all(&documents)
    }

    /// Records with the given name.
    pub async fn find_by_name(&self, name: &str) -> GatewayResult<Vec<Record>> {
        self.find_by(&Selector::new().eq("name", name)).await
    }

    /// Records in the given category.
    pub async fn find_by_category(&self, category: &str) -> GatewayResult<Vec<Record>> {
        self.find_by(&Selector::new().eq("category", category))
            .await
    }

    /// Records with the given availability.
    pub async fn find_by_availability(&self, available: bool) -> GatewayResult<Vec<Record>> {
        self.find_by(&Selector::new().eq("available", Value::Bool(available)))
            .await
    }

    /// Records with the given gender.
    pub async fn find_by_gender(&self, gender: Gender) -> GatewayResult<Vec<Record>> {
        self.find_by(&Selector::new().eq("gender", gender.as_str()))
            .await
    }

    /// Deletes every record and returns how many were removed.
    ///
    /// Intended for tests and resets. Stops at the first failure; records
    /// deleted before it stay deleted.
    pub async fn remove_all(&self) -> GatewayResult<usize> {
        let records = self.find_all().await?;
        let mut removed = 0;
        for record in &records {
            self.delete(record).await?;
            removed += 1;
        }
        info!(removed, database = %self.database, "Removed all records");
        Ok(removed)
    }
}

fn decode_all(documents: &[Document]) -> GatewayResult<Vec<Record>> {
    documents
        .iter()
        .map(|document| RecordCodec::decode(document).map_err(GatewayError::from))
        .collect()
}
