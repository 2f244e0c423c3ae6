//! Test infrastructure for the record gateway.
//!
//! Each integration test binary pulls in this module with `mod common;` and
//! only uses part of it.
#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::*;
