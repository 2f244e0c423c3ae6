//! Gateway startup: validate configuration, connect, ensure the database.

use std::sync::Arc;

use tracing::{debug, info};

use crate::client::{ClientError, DocumentStoreClient};
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::RecordGateway;
use crate::retry::RetryPolicy;

#[cfg(feature = "couchdb")]
use crate::{backends::couchdb::CouchDbClient, config::StoreConfig, error::ValidationError};

/// Connects to the configured CouchDB service and returns a gateway over
/// `config.database`, creating the database if needed.
///
/// # Errors
///
/// * `GatewayError::Validation` - if the configuration is invalid
/// * `GatewayError::StoreRejected` - if the service refuses the requests, or
///   the database is still missing after creating it
/// * `GatewayError::StoreUnavailable` - if the service stays unreachable
#[cfg(feature = "couchdb")]
pub async fn connect(config: &StoreConfig) -> GatewayResult<RecordGateway> {
    config
        .validate()
        .map_err(|errors| ValidationError::InvalidConfiguration {
            message: errors.join("; "),
        })?;

    let couch = config.couchdb_config()?;
    info!(url = %couch.url, database = %config.database, "Connecting to document store");

    let client = CouchDbClient::new(couch).map_err(|source| GatewayError::StoreRejected {
        operation: "connect",
        source,
    })?;

    connect_with(Arc::new(client), &config.database, config.retry_policy()).await
}

/// Builds a gateway over an existing client after ensuring `database` exists.
pub async fn connect_with(
    client: Arc<dyn DocumentStoreClient>,
    database: &str,
    retry: RetryPolicy,
) -> GatewayResult<RecordGateway> {
    retry.validate()?;
    ensure_database(client.as_ref(), database, &retry).await?;
    Ok(RecordGateway::new(client, database, retry))
}

/// Creates `database` if it does not exist, then checks that it does.
///
/// A concurrent creation by another process is not an error.
pub async fn ensure_database(
    client: &dyn DocumentStoreClient,
    database: &str,
    retry: &RetryPolicy,
) -> GatewayResult<()> {
    let exists = retry
        .execute("database_exists", move || client.database_exists(database))
        .await?;
    if exists {
        debug!(database, "Database exists");
        return Ok(());
    }

    info!(database, "Creating database");
    match retry
        .execute("create_database", move || client.create_database(database))
        .await
    {
        Ok(()) => {}
        Err(err) if err.is_conflict() => debug!(database, "Database created concurrently"),
        Err(err) => return Err(err),
    }

    let exists = retry
        .execute("database_exists", move || client.database_exists(database))
        .await?;
    if !exists {
        return Err(GatewayError::StoreRejected {
            operation: "ensure_database",
            source: ClientError::NotFound,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::backends::memory::InMemoryDocumentStore;
    use crate::client::{Document, DocumentRow, WriteResult};
    use crate::types::Selector;

    /// Accepts database creation but never reports the database as present.
    struct VanishingStore;

    #[async_trait]
    impl DocumentStoreClient for VanishingStore {
        async fn post_document(&self, _: &str, _: &Document) -> Result<WriteResult, ClientError> {
            Err(ClientError::NotFound)
        }
        async fn get_document(&self, _: &str, _: &str) -> Result<Document, ClientError> {
            Err(ClientError::NotFound)
        }
        async fn delete_document(&self, _: &str, _: &str, _: &str) -> Result<WriteResult, ClientError> {
            Err(ClientError::NotFound)
        }
        async fn list_all_documents(&self, _: &str, _: bool) -> Result<Vec<DocumentRow>, ClientError> {
            Err(ClientError::NotFound)
        }
        async fn find(&self, _: &str, _: &Selector) -> Result<Vec<Document>, ClientError> {
            Err(ClientError::NotFound)
        }
        async fn database_exists(&self, _: &str) -> Result<bool, ClientError> {
            Ok(false)
        }
        async fn create_database(&self, _: &str) -> Result<(), ClientError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_creates_missing_database() {
        let store = InMemoryDocumentStore::new();
        let gateway = connect_with(Arc::new(store.clone()), "pets", RetryPolicy::no_retry())
            .await
            .unwrap();

        assert_eq!(gateway.database(), "pets");
        assert!(store.database_exists("pets").await.unwrap());
    }

    #[tokio::test]
    async fn test_existing_database_is_reused() {
        let store = InMemoryDocumentStore::with_databases(&["pets"]);
        store.insert_raw("pets", "keep", serde_json::json!({"name": "Rex"}));

        connect_with(Arc::new(store.clone()), "pets", RetryPolicy::no_retry())
            .await
            .unwrap();

        assert_eq!(store.document_count("pets"), 1);
        assert_eq!(store.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_retries_transient_failures() {
        let store = InMemoryDocumentStore::new();
        store.fail_next(2, ClientError::Transport("connection refused".to_string()));

        let retry = RetryPolicy::new(5, Duration::from_millis(100), 2.0);
        connect_with(Arc::new(store.clone()), "pets", retry)
            .await
            .unwrap();

        // Two failed probes, then exists, create, exists.
        assert_eq!(store.call_count(), 5);
    }

    #[tokio::test]
    async fn test_missing_after_create_is_rejected() {
        let err = ensure_database(&VanishingStore, "pets", &RetryPolicy::no_retry())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::StoreRejected {
                operation: "ensure_database",
                source: ClientError::NotFound,
            }
        ));
    }

    #[tokio::test]
    async fn test_invalid_retry_policy_is_rejected() {
        let store = InMemoryDocumentStore::new();
        let err = connect_with(
            Arc::new(store.clone()),
            "pets",
            RetryPolicy::new(0, Duration::ZERO, 2.0),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, GatewayError::Validation(_)));
        assert_eq!(store.call_count(), 0);
    }

    #[cfg(feature = "couchdb")]
    #[tokio::test]
    async fn test_connect_rejects_invalid_config() {
        let config = StoreConfig {
            auth_type: crate::config::AuthType::Iam,
            ..StoreConfig::for_testing()
        };
        let err = connect(&config).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Validation(ValidationError::InvalidConfiguration { .. })
        ));
    }
}
