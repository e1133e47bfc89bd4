//! Local schema cache.
//!
//! Schema records are persisted as one JSON file per schema name, grouped in
//! one directory per configuration namespace.

pub mod files;

pub use files::{SchemaStore, StoreError, StoreResult};
