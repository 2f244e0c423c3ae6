//! Record persistence over a CouchDB-compatible document store.
//!
//! This crate stores and queries [`Record`](types::Record) entities in a
//! CouchDB / Cloudant database. Every store call is retried with bounded
//! exponential backoff when it fails transiently, and concurrent writers are
//! kept apart by the store's revision check.
//!
//! # Features
//!
//! - **Codec**: strict translation between records and wire documents
//! - **Retry**: one reusable policy applied to every store call
//! - **Optimistic concurrency**: stale revisions surface as conflicts
//! - **Pluggable clients**: CouchDB over HTTP, or an in-memory store for tests
//!
//! Backend features:
//! - `couchdb` (default) - HTTP client via `reqwest`
//!
//! # Architecture
//!
//! - [`types`] - the record, its gender enumeration and query selectors
//! - [`codec`] - record/document translation
//! - [`retry`] - bounded backoff executor
//! - [`client`] - the document store client trait and its error taxonomy
//! - [`backends`] - CouchDB and in-memory clients
//! - [`gateway`] - CRUD and queries over one database
//! - [`config`] - environment-driven connection settings
//! - [`bootstrap`] - connect and ensure the database exists
//! - [`error`] - gateway error types
//!
//! # Quick Start
//!
//! ```no_run
//! use recordstore_persistence::bootstrap;
//! use recordstore_persistence::config::StoreConfig;
//! use recordstore_persistence::types::{Gender, Record};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = bootstrap::connect(&StoreConfig::from_env()?).await?;
//!
//! let mut fido = Record::new("Fido")
//!     .with_category("dog")
//!     .with_gender(Gender::Male);
//! gateway.create(&mut fido).await?;
//!
//! fido.available = false;
//! gateway.update(&mut fido).await?;
//!
//! for dog in gateway.find_by_category("dog").await? {
//!     println!("{dog}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! Two copies of the same record race on update; the store accepts the first
//! and rejects the second as a conflict:
//!
//! ```
//! use std::sync::Arc;
//! use recordstore_persistence::backends::InMemoryDocumentStore;
//! use recordstore_persistence::types::Record;
//! use recordstore_persistence::{RecordGateway, RetryPolicy};
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryDocumentStore::with_databases(&["pets"]);
//! let gateway = RecordGateway::new(Arc::new(store), "pets", RetryPolicy::no_retry());
//!
//! let mut original = Record::new("Fido");
//! let id = gateway.create(&mut original).await.unwrap();
//!
//! let mut first = gateway.find_by_id(&id).await.unwrap().unwrap();
//! let mut second = first.clone();
//!
//! first.name = "Rex".to_string();
//! gateway.update(&mut first).await.unwrap();
//!
//! second.name = "Max".to_string();
//! let err = gateway.update(&mut second).await.unwrap_err();
//! assert!(err.is_conflict());
//! # });
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod bootstrap;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod gateway;
mod humantime_serde;
pub mod retry;
pub mod types;

// Re-export commonly used types at crate root
pub use client::{ClientError, Document, DocumentStoreClient};
pub use codec::RecordCodec;
pub use config::StoreConfig;
pub use error::{GatewayError, GatewayResult, ValidationError};
pub use gateway::RecordGateway;
pub use retry::RetryPolicy;
pub use types::{Gender, Record, Selector};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
