use std::collections::BTreeMap;

use chakra_store::models::{Database, DatabaseIndex, SchemaRecord, SyncReport};
use chakra_store::schema::make_schema_key;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::schema::{build_index, extract, find_collisions};

use super::{ChakraControlPlane, ControlError};

/// Result of a sync pass, with the extracted records kept for callers that
/// need them without re-reading the store.
pub(crate) struct SyncOutcome {
    pub(crate) report: SyncReport,
    pub(crate) records: BTreeMap<String, SchemaRecord>,
}

impl ChakraControlPlane {
    /// Runs a sync pass using the configured index key and schema prefix.
    ///
    /// # Errors
    /// Returns `ControlError::Gateway` if database discovery fails.
    pub async fn sync_default(&self) -> Result<SyncReport, ControlError> {
        let index_key = self.config.index_key.clone();
        let schema_prefix = self.config.schema_prefix.clone();
        self.sync(&index_key, &schema_prefix).await
    }

    /// Discovers every reachable database, rebuilds the name index, and
    /// caches each schema in the memory service and the local store.
    ///
    /// Only a discovery failure aborts the pass. Invalid databases and
    /// per-database storage failures are listed in the report's `errors`.
    ///
    /// # Errors
    /// Returns `ControlError::InvalidInput` for blank keys and
    /// `ControlError::Gateway` if database discovery fails.
    pub async fn sync(
        &self,
        index_key: &str,
        schema_prefix: &str,
    ) -> Result<SyncReport, ControlError> {
        Ok(self.run_sync(index_key, schema_prefix).await?.report)
    }

    pub(crate) async fn run_sync(
        &self,
        index_key: &str,
        schema_prefix: &str,
    ) -> Result<SyncOutcome, ControlError> {
        let index_key = super::require(index_key, "index_key")?;
        let schema_prefix = super::require(schema_prefix, "schema_prefix")?;
        let namespace = self.store.namespace();

        let raw = self.gateway.list_databases().await?;
        info!(namespace, discovered = raw.len(), "discovered databases");

        let mut errors = Vec::new();
        let databases = validate_all(raw, &mut errors);

        for (name, ids) in find_collisions(&databases) {
            warn!(
                namespace,
                name = %name,
                ?ids,
                "database name maps to several ids; keeping the last"
            );
        }
        let index = build_index(&databases);
        if let Err(err) = self.memory.store(index_key, index_value(&index)).await {
            warn!(namespace, key = index_key, "failed to publish database index: {err}");
            errors.push(format!("index {index_key}: {err}"));
        }

        let mut schemas = Vec::with_capacity(databases.len());
        let mut records = BTreeMap::new();
        for database in &databases {
            let record = extract(database);
            let name = store_name(&record).to_string();
            match self.persist_schema(schema_prefix, &name, &record).await {
                // Same-titled databases share one store file; list the name once.
                Ok(()) if !schemas.contains(&name) => schemas.push(name.clone()),
                Ok(()) => {}
                Err(err) => {
                    warn!(
                        namespace,
                        schema = %name,
                        id = %record.id,
                        "failed to cache schema: {err}"
                    );
                    errors.push(format!("schema {name} ({}): {err}", record.id));
                }
            }
            records.insert(name, record);
        }

        let report = SyncReport {
            success: errors.is_empty(),
            errors,
            index,
            schemas,
        };
        info!(
            namespace,
            stored = report.schemas.len(),
            failed = report.errors.len(),
            "sync pass finished"
        );
        Ok(SyncOutcome { report, records })
    }

    async fn persist_schema(
        &self,
        schema_prefix: &str,
        name: &str,
        record: &SchemaRecord,
    ) -> Result<(), ControlError> {
        let value = serde_json::to_value(record).map_err(crate::memory::MemoryError::from)?;
        self.memory
            .store(&make_schema_key(schema_prefix, &record.id), value)
            .await?;
        self.store.save(name, record).await?;
        Ok(())
    }
}

fn validate_all(raw: Vec<Value>, errors: &mut Vec<String>) -> Vec<Database> {
    let mut databases = Vec::with_capacity(raw.len());
    for (position, value) in raw.into_iter().enumerate() {
        let label = value
            .get("id")
            .and_then(Value::as_str)
            .map_or_else(|| format!("#{position}"), str::to_string);
        match Database::from_value(value) {
            Ok(database) => databases.push(database),
            Err(err) => {
                warn!(database = %label, "dropping invalid database: {err}");
                errors.push(format!("database {label}: invalid shape: {err}"));
            }
        }
    }
    databases
}

fn index_value(index: &DatabaseIndex) -> Value {
    Value::Object(
        index
            .iter()
            .map(|(name, id)| (name.clone(), Value::String(id.clone())))
            .collect::<Map<String, Value>>(),
    )
}

/// Local store key for a record. Untitled databases are filed under their id.
fn store_name(record: &SchemaRecord) -> &str {
    if record.title.is_empty() {
        &record.id
    } else {
        &record.title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validation_drops_bad_items_and_records_errors() {
        let raw = vec![
            json!({ "id": "A1", "created_time": "2024-01-01T00:00:00Z", "title": [] }),
            json!({ "id": "B1", "title": [] }),
            json!({ "title": "not a list" }),
        ];
        let mut errors = Vec::new();

        let databases = validate_all(raw, &mut errors);

        assert_eq!(databases.len(), 1);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("database B1:"));
        assert!(errors[1].starts_with("database #2:"));
    }

    #[test]
    fn untitled_records_are_filed_by_id() {
        let record = SchemaRecord {
            id: "C3".to_string(),
            title: String::new(),
            properties: BTreeMap::new(),
        };
        assert_eq!(store_name(&record), "C3");
    }

    #[test]
    fn index_value_is_a_flat_object() {
        let mut index = DatabaseIndex::new();
        index.insert("Tasks".to_string(), "A1".to_string());
        assert_eq!(index_value(&index), json!({ "Tasks": "A1" }));
    }
}
