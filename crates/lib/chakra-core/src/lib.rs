//! Core services for chakra-mcp.
//!
//! This crate owns schema extraction and the file-backed schema cache, the
//! sync pass that keeps both the cache and the external memory service in step
//! with the remote workspace, the retry-wrapped remote gateway, and the
//! per-namespace registry the MCP server resolves control planes from.

pub mod blocks;
pub mod control;
pub mod gateway;
pub mod memory;
pub mod schema;
pub mod services;
pub mod store;
