//! Record fixtures and gateway helpers.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::{Value, json};

use recordstore_persistence::backends::InMemoryDocumentStore;
use recordstore_persistence::types::{Gender, Record};
use recordstore_persistence::{RecordGateway, RetryPolicy};

/// Database used by every test.
pub const DATABASE: &str = "pets";

/// A store with the test database already created.
pub fn create_store() -> InMemoryDocumentStore {
    InMemoryDocumentStore::with_databases(&[DATABASE])
}

/// A gateway over `store` that never retries.
pub fn create_gateway(store: &InMemoryDocumentStore) -> RecordGateway {
    RecordGateway::new(Arc::new(store.clone()), DATABASE, RetryPolicy::no_retry())
}

/// A gateway over `store` with `max_attempts` attempts and a 1s initial delay.
pub fn create_retrying_gateway(store: &InMemoryDocumentStore, max_attempts: u32) -> RecordGateway {
    RecordGateway::new(
        Arc::new(store.clone()),
        DATABASE,
        RetryPolicy::new(max_attempts, Duration::from_secs(1), 2.0),
    )
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

/// Fido: an available male dog born 2020-01-01.
pub fn fido() -> Record {
    Record::new("Fido")
        .with_category("dog")
        .with_available(true)
        .with_gender(Gender::Male)
        .with_birthday(date(2020, 1, 1))
}

/// Kitty: an unavailable female cat.
pub fn kitty() -> Record {
    Record::new("Kitty")
        .with_category("cat")
        .with_available(false)
        .with_gender(Gender::Female)
        .with_birthday(date(2019, 6, 15))
}

/// A small mixed shelter: two dogs, a cat, and a bird.
pub fn shelter() -> Vec<Record> {
    vec![
        fido(),
        kitty(),
        Record::new("Rex")
            .with_category("dog")
            .with_available(false)
            .with_gender(Gender::Male)
            .with_birthday(date(2018, 3, 9)),
        Record::new("Tweety")
            .with_category("bird")
            .with_available(true)
            .with_gender(Gender::Unknown)
            .with_birthday(date(2021, 11, 30)),
    ]
}

/// Creates every record and returns them with their assigned identity.
pub async fn create_all(gateway: &RecordGateway, records: Vec<Record>) -> Vec<Record> {
    let mut created = Vec::with_capacity(records.len());
    for mut record in records {
        gateway
            .create(&mut record)
            .await
            .expect("Failed to create record");
        created.push(record);
    }
    created
}

/// The wire document for a valid record, without identity.
pub fn record_document(name: &str, category: &str) -> Value {
    json!({
        "name": name,
        "category": category,
        "available": true,
        "gender": "UNKNOWN",
        "birthday": "2020-01-01"
    })
}

pub fn names(records: &[Record]) -> Vec<&str> {
    records.iter().map(|r| r.name.as_str()).collect()
}
