//! Document store client implementations.
//!
//! # Available Backends
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | CouchDB / Cloudant | `couchdb` (default) | HTTP client for the CouchDB document API |
//! | In-memory | always | Revision-checked store with fault injection, for tests and local runs |
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "couchdb")]
//! use recordstore_persistence::backends::couchdb::{CouchDbClient, CouchDbConfig};
//!
//! # #[cfg(feature = "couchdb")]
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CouchDbClient::new(CouchDbConfig {
//!     url: "http://localhost:5984".to_string(),
//!     ..Default::default()
//! })?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "couchdb")]
pub mod couchdb;

pub mod memory;

#[cfg(feature = "couchdb")]
pub use couchdb::{CouchDbAuth, CouchDbClient, CouchDbConfig};
pub use memory::InMemoryDocumentStore;
