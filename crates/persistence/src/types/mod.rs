//! Core types for the record gateway.
//!
//! - [`Record`] - the persisted entity, with store-managed id and revision
//! - [`Gender`] - explicit wire-name enumeration
//! - [`Selector`] - exact-match query constraints
//!
//! # Examples
//!
//! ```
//! use chrono::NaiveDate;
//! use recordstore_persistence::types::{Gender, Record};
//!
//! let record = Record::new("Fido")
//!     .with_category("dog")
//!     .with_gender(Gender::Male)
//!     .with_birthday(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
//!
//! assert!(record.id().is_none());
//! assert_eq!(record.gender.as_str(), "MALE");
//! ```

mod record;
mod selector;

pub use record::{Gender, Record};
pub use selector::Selector;
