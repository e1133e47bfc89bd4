//! External memory service used to share the database index and schema
//! records across processes.

pub mod surreal;

use std::collections::HashMap;
use std::{error::Error, fmt};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::RwLock;

pub use surreal::SurrealMemory;

#[derive(Debug)]
pub enum MemoryError {
    Surreal(Box<surrealdb::Error>),
    Encode(serde_json::Error),
    InvalidInput(String),
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surreal(err) => write!(f, "SurrealDB error: {err}"),
            Self::Encode(err) => write!(f, "memory value encoding error: {err}"),
            Self::InvalidInput(message) => write!(f, "Invalid input: {message}"),
        }
    }
}

impl Error for MemoryError {}

impl From<surrealdb::Error> for MemoryError {
    fn from(err: surrealdb::Error) -> Self {
        Self::Surreal(Box::new(err))
    }
}

impl From<serde_json::Error> for MemoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err)
    }
}

pub type MemoryResult<T> = Result<T, MemoryError>;

/// Key/value capability provided by the external memory service.
pub trait MemoryService: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    fn store<'a>(&'a self, key: &'a str, value: Value) -> BoxFuture<'a, MemoryResult<()>>;

    /// Fetches the value stored under `key`, if any.
    fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, MemoryResult<Option<Value>>>;
}

/// Process-local memory service.
#[derive(Debug, Default)]
pub struct InMemoryMemory {
    entries: RwLock<HashMap<String, Value>>,
}

impl InMemoryMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all stored keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl MemoryService for InMemoryMemory {
    fn store<'a>(&'a self, key: &'a str, value: Value) -> BoxFuture<'a, MemoryResult<()>> {
        async move {
            ensure_key(key)?;
            self.entries.write().await.insert(key.to_string(), value);
            Ok(())
        }
        .boxed()
    }

    fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, MemoryResult<Option<Value>>> {
        async move { Ok(self.entries.read().await.get(key).cloned()) }.boxed()
    }
}

pub(crate) fn ensure_key(key: &str) -> MemoryResult<()> {
    if key.trim().is_empty() {
        return Err(MemoryError::InvalidInput("memory key is required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn in_memory_store_replaces_and_fetches() {
        let memory = InMemoryMemory::new();
        memory.store("idx", json!({ "Tasks": "A1" })).await.expect("store");
        memory.store("idx", json!({ "Tasks": "A2" })).await.expect("replace");

        assert_eq!(
            memory.fetch("idx").await.expect("fetch"),
            Some(json!({ "Tasks": "A2" }))
        );
        assert_eq!(memory.fetch("missing").await.expect("fetch"), None);
        assert_eq!(memory.keys().await, vec!["idx".to_string()]);
    }

    #[tokio::test]
    async fn in_memory_rejects_blank_keys() {
        let memory = InMemoryMemory::new();
        let err = memory.store("  ", json!(1)).await.expect_err("blank key");
        assert!(matches!(err, MemoryError::InvalidInput(_)));
    }
}
