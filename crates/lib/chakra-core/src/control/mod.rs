use std::{error::Error, fmt, sync::Arc};

use chakra_store::schema::{DEFAULT_INDEX_KEY, DEFAULT_SCHEMA_PREFIX};

use crate::gateway::{GatewayError, RemoteGateway};
use crate::memory::{MemoryError, MemoryService};
use crate::store::{SchemaStore, StoreError};

pub mod content;
pub mod planning;
pub mod schemas;
pub mod sync;

pub use planning::{
    DEFAULT_PILLAR_STATUS,
    DEFAULT_PRIORITY,
    DEFAULT_STATUS,
    DEFAULT_UNIT,
    KeyResultRequest,
    PillarRequest,
    PlanningDatabases,
    ProjectRequest,
    TaskRequest,
};

#[derive(Debug)]
pub enum ControlError {
    Gateway(GatewayError),
    Store(StoreError),
    Memory(MemoryError),
    InvalidInput(String),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gateway(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Memory(err) => write!(f, "{err}"),
            Self::InvalidInput(message) => write!(f, "Invalid input: {message}"),
        }
    }
}

impl Error for ControlError {}

impl From<GatewayError> for ControlError {
    fn from(err: GatewayError) -> Self {
        Self::Gateway(err)
    }
}

impl From<StoreError> for ControlError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<MemoryError> for ControlError {
    fn from(err: MemoryError) -> Self {
        Self::Memory(err)
    }
}

/// Keys under which a sync pass publishes to the memory service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub index_key: String,
    pub schema_prefix: String,
}

impl SyncConfig {
    #[must_use]
    pub fn new(index_key: impl Into<String>, schema_prefix: impl Into<String>) -> Self {
        Self {
            index_key: index_key.into(),
            schema_prefix: schema_prefix.into(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_KEY, DEFAULT_SCHEMA_PREFIX)
    }
}

/// Operations for one configuration namespace: schema sync and cache lookups,
/// content passthroughs, and planning helpers.
#[derive(Clone)]
pub struct ChakraControlPlane {
    gateway: Arc<dyn RemoteGateway>,
    memory: Arc<dyn MemoryService>,
    store: SchemaStore,
    config: SyncConfig,
    planning: PlanningDatabases,
}

impl ChakraControlPlane {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        memory: Arc<dyn MemoryService>,
        store: SchemaStore,
    ) -> Self {
        Self {
            gateway,
            memory,
            store,
            config: SyncConfig::default(),
            planning: PlanningDatabases::default(),
        }
    }

    #[must_use]
    pub fn with_sync_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_planning(mut self, planning: PlanningDatabases) -> Self {
        self.planning = planning;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &SchemaStore {
        &self.store
    }

    #[must_use]
    pub const fn sync_config(&self) -> &SyncConfig {
        &self.config
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        self.store.namespace()
    }
}

pub(crate) fn require<'a>(value: &'a str, field: &str) -> Result<&'a str, ControlError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ControlError::InvalidInput(format!("{field} is required")));
    }
    Ok(trimmed)
}
