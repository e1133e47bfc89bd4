//! Workspace models and schema records for chakra-mcp.
//!
//! This crate defines the validated shape of remote databases and the
//! normalized schema records shared by the extractor, the schema store, and
//! the memory-service backends.

pub mod models;
pub mod schema;

pub use models::*;
