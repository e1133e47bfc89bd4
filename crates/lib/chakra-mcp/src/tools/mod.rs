//! MCP tool modules.
//!
//! Tools are grouped by domain: schema cache and sync, content passthroughs,
//! block editing, planning shortcuts, and contextual help.

pub mod blocks;
pub mod content;
pub mod planning;
pub mod schemas;
mod context;
