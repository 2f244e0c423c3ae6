//! In-memory [`DocumentStoreClient`] for tests and local development.
//!
//! Behaves like a CouchDB database as far as the gateway can observe:
//! store-assigned ids, `N-hash` revisions that change on every write,
//! revision-checked updates and deletes, listings in ascending id order.
//! Failures can be injected ahead of time to exercise the retry policy.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use crate::client::{ClientError, Document, DocumentRow, DocumentStoreClient, WriteResult};
use crate::types::Selector;

const CONFLICT_MESSAGE: &str = "Document update conflict.";

#[derive(Debug, Clone)]
struct StoredDocument {
    generation: u64,
    rev: String,
    body: Document,
}

impl StoredDocument {
    fn to_document(&self, id: &str) -> Document {
        let mut document = Document::new();
        document.insert("_id".to_string(), Value::String(id.to_string()));
        document.insert("_rev".to_string(), Value::String(self.rev.clone()));
        document.extend(self.body.clone());
        document
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    databases: HashMap<String, BTreeMap<String, StoredDocument>>,
    faults: VecDeque<ClientError>,
    calls: u64,
}

impl MemoryState {
    /// Counts the call and returns the next injected failure, if any.
    fn begin_call(&mut self) -> Result<(), ClientError> {
        self.calls += 1;
        match self.faults.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn database_mut(
        &mut self,
        database: &str,
    ) -> Result<&mut BTreeMap<String, StoredDocument>, ClientError> {
        self.databases
            .get_mut(database)
            .ok_or(ClientError::NotFound)
    }
}

/// Shared in-memory document store. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryDocumentStore {
    /// Creates a store with no databases.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with the given (empty) databases.
    pub fn with_databases(databases: &[&str]) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock();
            for name in databases {
                state.databases.insert((*name).to_string(), BTreeMap::new());
            }
        }
        store
    }

    /// Makes the next `count` calls fail with `error`, in addition to any
    /// failures already queued.
    pub fn fail_next(&self, count: usize, error: ClientError) {
        let mut state = self.state.lock();
        state
            .faults
            .extend(std::iter::repeat_n(error, count));
    }

    /// Drops any queued failures.
    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    /// Number of client calls made so far, including failed ones.
    pub fn call_count(&self) -> u64 {
        self.state.lock().calls
    }

    /// Number of live documents in `database`.
    pub fn document_count(&self, database: &str) -> usize {
        self.state
            .lock()
            .databases
            .get(database)
            .map_or(0, BTreeMap::len)
    }

    /// Stores an arbitrary JSON object under `id`, bypassing any validation.
    /// Returns the assigned revision.
    pub fn insert_raw(&self, database: &str, id: &str, body: Value) -> String {
        let mut body = match body {
            Value::Object(map) => map,
            _ => Document::new(),
        };
        body.remove("_id");
        body.remove("_rev");

        let rev = next_rev(1);
        let mut state = self.state.lock();
        state
            .databases
            .entry(database.to_string())
            .or_default()
            .insert(
                id.to_string(),
                StoredDocument {
                    generation: 1,
                    rev: rev.clone(),
                    body,
                },
            );
        rev
    }
}

fn next_rev(generation: u64) -> String {
    format!("{}-{}", generation, Uuid::new_v4().simple())
}

fn conflict() -> ClientError {
    ClientError::Conflict(CONFLICT_MESSAGE.to_string())
}

#[async_trait]
impl DocumentStoreClient for InMemoryDocumentStore {
    async fn post_document(
        &self,
        database: &str,
        document: &Document,
    ) -> Result<WriteResult, ClientError> {
        let mut state = self.state.lock();
        state.begin_call()?;
        let documents = state.database_mut(database)?;

        let mut body = document.clone();
        let id = match body.remove("_id") {
            Some(Value::String(id)) => Some(id),
            Some(other) => {
                return Err(ClientError::BadRequest(format!(
                    "Document id must be a string, got {other}"
                )));
            }
            None => None,
        };
        let supplied_rev = body
            .remove("_rev")
            .and_then(|rev| rev.as_str().map(str::to_string));

        let id = id.unwrap_or_else(|| Uuid::new_v4().simple().to_string());

        let generation = match (documents.get(&id), supplied_rev.as_deref()) {
            (Some(current), Some(rev)) if current.rev == rev => current.generation + 1,
            (Some(_), _) => return Err(conflict()),
            // Writing to a missing document with a revision means it was deleted.
            (None, Some(_)) => return Err(conflict()),
            (None, None) => 1,
        };

        let rev = next_rev(generation);
        documents.insert(
            id.clone(),
            StoredDocument {
                generation,
                rev: rev.clone(),
                body,
            },
        );

        Ok(WriteResult { ok: true, id, rev })
    }

    async fn get_document(&self, database: &str, id: &str) -> Result<Document, ClientError> {
        let mut state = self.state.lock();
        state.begin_call()?;
        let documents = state.database_mut(database)?;

        documents
            .get(id)
            .map(|stored| stored.to_document(id))
            .ok_or(ClientError::NotFound)
    }

    async fn delete_document(
        &self,
        database: &str,
        id: &str,
        rev: &str,
    ) -> Result<WriteResult, ClientError> {
        let mut state = self.state.lock();
        state.begin_call()?;
        let documents = state.database_mut(database)?;

        let current = documents.get(id).ok_or(ClientError::NotFound)?;
        if current.rev != rev {
            return Err(conflict());
        }

        let tombstone_rev = next_rev(current.generation + 1);
        documents.remove(id);

        Ok(WriteResult {
            ok: true,
            id: id.to_string(),
            rev: tombstone_rev,
        })
    }

    async fn list_all_documents(
        &self,
        database: &str,
        include_docs: bool,
    ) -> Result<Vec<DocumentRow>, ClientError> {
        let mut state = self.state.lock();
        state.begin_call()?;
        let documents = state.database_mut(database)?;

        Ok(documents
            .iter()
            .map(|(id, stored)| DocumentRow {
                id: id.clone(),
                rev: stored.rev.clone(),
                doc: include_docs.then(|| stored.to_document(id)),
            })
            .collect())
    }

    async fn find(
        &self,
        database: &str,
        selector: &Selector,
    ) -> Result<Vec<Document>, ClientError> {
        let mut state = self.state.lock();
        state.begin_call()?;
        let documents = state.database_mut(database)?;

        Ok(documents
            .iter()
            .map(|(id, stored)| stored.to_document(id))
            .filter(|document| selector.matches(document))
            .collect())
    }

    async fn database_exists(&self, database: &str) -> Result<bool, ClientError> {
        let mut state = self.state.lock();
        state.begin_call()?;
        Ok(state.databases.contains_key(database))
    }

    async fn create_database(&self, database: &str) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        state.begin_call()?;
        if state.databases.contains_key(database) {
            return Err(ClientError::Conflict(format!(
                "The database {database} could not be created, the file already exists."
            )));
        }
        state.databases.insert(database.to_string(), BTreeMap::new());
        Ok(())
    }
}
