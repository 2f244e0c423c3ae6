//! Create, read, update and delete through the record gateway.
//!
//! These tests run the gateway against the in-memory document store, which
//! enforces the same revision rules as CouchDB.

mod common;

use serde_json::json;

use common::*;
use recordstore_persistence::types::{Gender, Record};
use recordstore_persistence::{ClientError, GatewayError, ValidationError};

// ============================================================================
// Scenario
// ============================================================================

/// Test the full lifecycle of a single record: create, read back, delete.
#[tokio::test]
async fn test_fido_lifecycle() {
    let store = create_store();
    let gateway = create_gateway(&store);

    let mut record = fido();
    let id = gateway.create(&mut record).await.unwrap();

    assert!(!id.is_empty());
    assert_eq!(record.id(), Some(id.as_str()));
    assert!(!record.revision().unwrap_or_default().is_empty());

    let loaded = gateway.find_by_id(&id).await.unwrap().expect("record exists");
    assert_eq!(loaded.name, "Fido");
    assert_eq!(loaded.category.as_deref(), Some("dog"));
    assert!(loaded.available);
    assert_eq!(loaded.gender, Gender::Male);
    assert_eq!(loaded.birthday, date(2020, 1, 1));
    assert_eq!(loaded, record);

    gateway.delete(&loaded).await.unwrap();
    assert!(gateway.find_by_id(&id).await.unwrap().is_none());
    assert_eq!(store.document_count(DATABASE), 0);
}

// ============================================================================
// Create Tests
// ============================================================================

/// Test that create assigns distinct identities to distinct records.
#[tokio::test]
async fn test_create_assigns_identity() {
    let store = create_store();
    let gateway = create_gateway(&store);

    let created = create_all(&gateway, shelter()).await;

    let mut ids: Vec<_> = created.iter().map(|r| r.id().unwrap()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4);
    assert!(created.iter().all(|r| r.is_persisted()));
}

/// Test that a record without a name is rejected before reaching the store.
#[tokio::test]
async fn test_create_requires_name() {
    let store = create_store();
    let gateway = create_gateway(&store);

    let mut record = Record::new("   ").with_category("dog");
    let err = gateway.create(&mut record).await.unwrap_err();

    assert!(matches!(
        err,
        GatewayError::Validation(ValidationError::MissingField { field: "name" })
    ));
    assert_eq!(store.call_count(), 0);
    assert!(record.id().is_none());
}

/// Test that create against a missing database surfaces the store's refusal.
#[tokio::test]
async fn test_create_in_missing_database() {
    let store = recordstore_persistence::backends::InMemoryDocumentStore::new();
    let gateway = create_gateway(&store);

    let err = gateway.create(&mut fido()).await.unwrap_err();
    assert!(err.is_not_found());
}

// ============================================================================
// Read Tests
// ============================================================================

/// Test that a missing id is absent rather than an error.
#[tokio::test]
async fn test_find_missing_is_absent() {
    let store = create_store();
    let gateway = create_gateway(&store);

    assert!(gateway.find_by_id("missing").await.unwrap().is_none());
}

/// Test that a blank id is absent and never reaches the store.
#[tokio::test]
async fn test_find_blank_id_is_absent() {
    let store = create_store();
    let gateway = create_gateway(&store);
    create_all(&gateway, shelter()).await;
    let calls = store.call_count();

    for id in ["", "   "] {
        assert!(gateway.find_by_id(id).await.unwrap().is_none(), "{id:?}");
    }
    assert_eq!(store.call_count(), calls);
}

/// Test that an undecodable stored document fails the lookup.
#[tokio::test]
async fn test_find_by_id_rejects_invalid_document() {
    let store = create_store();
    let gateway = create_gateway(&store);
    store.insert_raw(DATABASE, "broken", json!({"name": "Ghost", "category": "dog"}));

    let err = gateway.find_by_id("broken").await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Validation(ValidationError::MissingField { field: "available" })
    ));
}

/// Test that a document written by another client decodes with its identity.
#[tokio::test]
async fn test_find_by_id_reads_foreign_document() {
    let store = create_store();
    let gateway = create_gateway(&store);
    let rev = store.insert_raw(DATABASE, "external", record_document("Nemo", "fish"));

    let record = gateway.find_by_id("external").await.unwrap().unwrap();
    assert_eq!(record.id(), Some("external"));
    assert_eq!(record.revision(), Some(rev.as_str()));
    assert_eq!(record.gender, Gender::Unknown);
}

// ============================================================================
// Update Tests
// ============================================================================

/// Test that update writes new data and refreshes the revision.
#[tokio::test]
async fn test_update_refreshes_revision() {
    let store = create_store();
    let gateway = create_gateway(&store);

    let mut record = fido();
    let id = gateway.create(&mut record).await.unwrap();
    let first_rev = record.revision().unwrap().to_string();

    record.available = false;
    record.category = None;
    gateway.update(&mut record).await.unwrap();

    let second_rev = record.revision().unwrap();
    assert_ne!(second_rev, first_rev);
    assert!(second_rev.starts_with("2-"));

    let loaded = gateway.find_by_id(&id).await.unwrap().unwrap();
    assert!(!loaded.available);
    assert_eq!(loaded.category, None);
    assert_eq!(loaded.revision(), Some(second_rev));
}

/// Test that updating a record that was never created is a validation error.
#[tokio::test]
async fn test_update_requires_identity() {
    let store = create_store();
    let gateway = create_gateway(&store);

    let err = gateway.update(&mut fido()).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Validation(ValidationError::MissingIdentity { operation: "update" })
    ));
    assert_eq!(store.call_count(), 0);
}

// ============================================================================
// Delete Tests
// ============================================================================

/// Test that a removed record can be neither updated nor deleted again.
#[tokio::test]
async fn test_removed_record_rejects_further_writes() {
    let store = create_store();
    let gateway = create_gateway(&store);

    let mut record = fido();
    gateway.create(&mut record).await.unwrap();
    gateway.delete(&record).await.unwrap();

    // The id stays on the in-memory record.
    assert!(record.id().is_some());

    let err = gateway.delete(&record).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::StoreRejected {
            operation: "delete",
            source: ClientError::NotFound,
        }
    ));

    let err = gateway.update(&mut record).await.unwrap_err();
    assert!(err.is_conflict());
}

/// Test that delete with a stale revision leaves the document in place.
#[tokio::test]
async fn test_delete_with_stale_revision() {
    let store = create_store();
    let gateway = create_gateway(&store);

    let mut record = fido();
    gateway.create(&mut record).await.unwrap();
    let stale = record.clone();

    record.name = "Fido II".to_string();
    gateway.update(&mut record).await.unwrap();

    let err = gateway.delete(&stale).await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(store.document_count(DATABASE), 1);
}
