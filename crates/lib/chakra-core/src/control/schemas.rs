use std::collections::BTreeSet;

use chakra_store::models::SchemaRecord;
use tracing::{debug, info};

use crate::store::SchemaStore;

use super::{ChakraControlPlane, ControlError};

impl ChakraControlPlane {
    /// Returns a cached schema, running one full sync on a cache miss.
    ///
    /// After the fallback sync the record is taken from that pass's result,
    /// so a name the remote does not know yields `None`. Names match exactly,
    /// surrounding whitespace included.
    ///
    /// # Errors
    /// Returns `ControlError` if the name is blank or the fallback sync cannot
    /// discover databases.
    pub async fn get_schema(&self, name: &str) -> Result<Option<SchemaRecord>, ControlError> {
        super::require(name, "name")?;
        if let Some(record) = self.store.load(name).await {
            debug!(namespace = self.namespace(), schema = name, "schema cache hit");
            return Ok(Some(record));
        }

        info!(namespace = self.namespace(), schema = name, "schema cache miss, syncing");
        let index_key = self.config.index_key.clone();
        let schema_prefix = self.config.schema_prefix.clone();
        let mut outcome = self.run_sync(&index_key, &schema_prefix).await?;
        Ok(outcome.records.remove(name))
    }

    /// Lists schema names cached in this namespace.
    ///
    /// # Errors
    /// Returns `ControlError::Store` if the namespace directory cannot be read.
    pub async fn list_schemas(&self) -> Result<BTreeSet<String>, ControlError> {
        Ok(self.store.list_names().await?)
    }

    /// Lists every namespace with cached schemas under the store root.
    ///
    /// # Errors
    /// Returns `ControlError::Store` if the root directory cannot be read.
    pub async fn list_namespaces(&self) -> Result<BTreeSet<String>, ControlError> {
        Ok(SchemaStore::list_namespaces(self.store.root()).await?)
    }
}
