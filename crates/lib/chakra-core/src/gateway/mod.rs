//! Remote workspace gateway.
//!
//! [`RemoteGateway`] is the boundary to the remote content API. The HTTP
//! implementation lives in [`notion`]; [`retry`] wraps any gateway with a
//! bounded exponential backoff policy.

pub mod notion;
pub mod retry;

use std::{error::Error, fmt};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use notion::{NotionClient, NotionClientConfig};
pub use retry::{RetryPolicy, RetryingGateway, Sleeper, TokioSleeper};

#[derive(Debug, Clone)]
pub enum GatewayError {
    /// The request never produced a response (connect failure, timeout).
    Transport(String),
    /// The remote answered with a non-success status.
    Status { status: u16, message: String },
    /// The response body did not have the expected shape.
    Decode(String),
    /// The client could not be configured (bad credentials header, TLS setup).
    Config(String),
    /// A transient failure persisted through every allowed attempt.
    Exhausted {
        operation: &'static str,
        attempts: u32,
        last: Box<Self>,
    },
}

impl GatewayError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => matches!(*status, 408 | 429 | 500..=599),
            Self::Decode(_) | Self::Config(_) | Self::Exhausted { .. } => false,
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "remote transport error: {message}"),
            Self::Status { status, message } => {
                write!(f, "remote returned status {status}: {message}")
            }
            Self::Decode(message) => write!(f, "unexpected remote response: {message}"),
            Self::Config(message) => write!(f, "remote client configuration error: {message}"),
            Self::Exhausted {
                operation,
                attempts,
                last,
            } => write!(f, "{operation} failed after {attempts} attempts: {last}"),
        }
    }
}

impl Error for GatewayError {}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Filter, sort, and paging options for a database query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryDatabaseRequest {
    pub database_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sorts: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

/// Workspace search options.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

/// Page creation payload; the page is created inside `database_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CreatePageRequest {
    pub database_id: String,
    pub properties: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Value>,
}

/// Page property update payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdatePageRequest {
    pub page_id: String,
    pub properties: Value,
    #[serde(default)]
    pub archived: bool,
}

/// Paging options for listing a block's children.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BlockChildrenRequest {
    pub block_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

/// Remote operations the schema sync and content tools depend on.
///
/// Read operations are idempotent and safe to retry.
pub trait RemoteGateway: Send + Sync {
    /// Lists every reachable database with full field descriptors.
    fn list_databases(&self) -> BoxFuture<'_, GatewayResult<Vec<Value>>>;

    fn get_database<'a>(&'a self, database_id: &'a str) -> BoxFuture<'a, GatewayResult<Value>>;

    fn query_database<'a>(
        &'a self,
        request: &'a QueryDatabaseRequest,
    ) -> BoxFuture<'a, GatewayResult<Value>>;

    fn search<'a>(&'a self, request: &'a SearchRequest) -> BoxFuture<'a, GatewayResult<Value>>;

    fn create_page<'a>(
        &'a self,
        request: &'a CreatePageRequest,
    ) -> BoxFuture<'a, GatewayResult<Value>>;

    fn update_page<'a>(
        &'a self,
        request: &'a UpdatePageRequest,
    ) -> BoxFuture<'a, GatewayResult<Value>>;

    fn get_block_children<'a>(
        &'a self,
        request: &'a BlockChildrenRequest,
    ) -> BoxFuture<'a, GatewayResult<Value>>;

    fn append_block_children<'a>(
        &'a self,
        block_id: &'a str,
        children: &'a [Value],
    ) -> BoxFuture<'a, GatewayResult<Value>>;

    fn update_block<'a>(
        &'a self,
        block_id: &'a str,
        payload: &'a Value,
    ) -> BoxFuture<'a, GatewayResult<Value>>;

    fn delete_block<'a>(&'a self, block_id: &'a str) -> BoxFuture<'a, GatewayResult<Value>>;
}
