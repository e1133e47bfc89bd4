use std::sync::Arc;

use chakra_store::schema::TABLE_MEMORY;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use surrealdb::types::SurrealValue;
use surrealdb::{Connection, Surreal};

use super::{MemoryResult, MemoryService, ensure_key};

/// Row stored in the `memory` table. Values are kept as JSON text so that
/// arbitrary payloads survive untouched by the database's own record rules.
#[derive(Debug, Clone, Serialize, Deserialize, SurrealValue)]
struct MemoryEntry {
    key: String,
    value: String,
}

/// Memory service backed by a `SurrealDB` table keyed by memory key.
pub struct SurrealMemory<C: Connection> {
    db: Arc<Surreal<C>>,
}

impl<C: Connection> Clone for SurrealMemory<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealMemory<C> {
    #[must_use]
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db: Arc::new(db),
        }
    }

    #[must_use]
    pub const fn from_arc(db: Arc<Surreal<C>>) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn db(&self) -> &Surreal<C> {
        &self.db
    }

    /// Upserts a memory entry by key.
    ///
    /// # Errors
    /// Returns `MemoryError` if the key is blank, the value cannot be encoded,
    /// or the database write fails.
    pub async fn put(&self, key: &str, value: &Value) -> MemoryResult<()> {
        ensure_key(key)?;
        let entry = MemoryEntry {
            key: key.to_string(),
            value: serde_json::to_string(value)?,
        };
        let _: Option<MemoryEntry> = self
            .db
            .upsert((TABLE_MEMORY, key.to_string()))
            .content(entry)
            .await?;
        Ok(())
    }

    /// Fetches a memory entry by key.
    ///
    /// # Errors
    /// Returns `MemoryError` if the database query fails or the stored text is
    /// not valid JSON.
    pub async fn get(&self, key: &str) -> MemoryResult<Option<Value>> {
        let record: Option<MemoryEntry> = self.db.select((TABLE_MEMORY, key)).await?;
        record
            .map(|entry| serde_json::from_str(&entry.value).map_err(Into::into))
            .transpose()
    }
}

impl<C: Connection> MemoryService for SurrealMemory<C> {
    fn store<'a>(&'a self, key: &'a str, value: Value) -> BoxFuture<'a, MemoryResult<()>> {
        async move { self.put(key, &value).await }.boxed()
    }

    fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, MemoryResult<Option<Value>>> {
        async move { self.get(key).await }.boxed()
    }
}
