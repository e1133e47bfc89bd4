use std::sync::Arc;

use chakra_core::control::ChakraControlPlane;
use chakra_core::gateway::{
    GatewayResult,
    NotionClient,
    NotionClientConfig,
    RemoteGateway,
    RetryingGateway,
};
use chakra_core::memory::{MemoryService, SurrealMemory};
use chakra_core::services::{
    BuildHandleFn,
    NamespaceHandle,
    NamespaceRegistry,
    NamespaceRegistryConfig,
    RegistryError,
};
use chakra_core::store::SchemaStore;
use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::config::{ChakraConfig, MemoryBackend};

/// Connects the memory service selected by the configuration.
///
/// # Errors
/// Returns the `SurrealDB` error if the engine cannot be started, the
/// credentials are rejected, or the namespace cannot be selected.
pub async fn build_memory(
    config: &ChakraConfig,
) -> Result<Arc<dyn MemoryService>, surrealdb::Error> {
    let db: Surreal<Any> = match &config.memory {
        MemoryBackend::InMemory {
            namespace,
            database,
        } => {
            let db = any::connect("mem://").await?;
            db.use_ns(namespace.as_str()).use_db(database.as_str()).await?;
            info!(namespace = %namespace, database = %database, "using in-process memory service");
            db
        }
        MemoryBackend::Remote {
            uri,
            username,
            password,
            namespace,
            database,
        } => {
            let endpoint = if uri.contains("://") {
                uri.clone()
            } else {
                format!("ws://{uri}")
            };
            let db = any::connect(endpoint.as_str()).await?;
            db.signin(Root {
                username: username.clone(),
                password: password.clone(),
            })
            .await?;
            db.use_ns(namespace.as_str()).use_db(database.as_str()).await?;
            info!(
                endpoint = %endpoint,
                namespace = %namespace,
                "connected to remote memory service"
            );
            db
        }
    };
    Ok(Arc::new(SurrealMemory::new(db)))
}

/// Builds the retry-wrapped remote gateway.
///
/// # Errors
/// Returns `GatewayError::Config` if the HTTP client cannot be configured.
pub fn build_gateway(config: &ChakraConfig) -> GatewayResult<Arc<dyn RemoteGateway>> {
    let client = NotionClient::new(
        NotionClientConfig::new(config.api_key.clone())
            .with_base_url(config.notion_base_url.clone())
            .with_notion_version(config.notion_version.clone())
            .with_request_timeout(config.request_timeout),
    )?;
    Ok(Arc::new(RetryingGateway::new(client, config.retry)))
}

pub fn build_registry(
    config: &ChakraConfig,
    gateway: Arc<dyn RemoteGateway>,
    memory: Arc<dyn MemoryService>,
) -> NamespaceRegistry {
    let build_config = config.clone();
    let build: BuildHandleFn = Arc::new(move |namespace: String| {
        let config = build_config.clone();
        let gateway = gateway.clone();
        let memory = memory.clone();
        Box::pin(async move {
            let store = SchemaStore::new(&config.schema_root, namespace).map_err(map_build_error)?;
            let control = ChakraControlPlane::new(gateway, memory, store)
                .with_sync_config(config.sync.clone())
                .with_planning(config.planning.clone());
            info!(namespace = control.namespace(), "namespace ready");
            Ok(Arc::new(NamespaceHandle::new(control)))
        })
    });

    let mut registry_config = NamespaceRegistryConfig::new(build)
        .with_sweep_interval(config.sweep_interval);
    if let Some(ttl) = config.registry_ttl {
        registry_config = registry_config.with_ttl(ttl);
    }
    if let Some(max_entries) = config.max_entries {
        registry_config = registry_config.with_max_entries(max_entries);
    }

    NamespaceRegistry::new(registry_config)
}

fn map_build_error(err: impl std::fmt::Display) -> RegistryError {
    RegistryError::BuildFailed(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliArgs;
    use clap::Parser;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_config(schema_root: &TempDir) -> ChakraConfig {
        let root = schema_root.path().display().to_string();
        let args = CliArgs::parse_from([
            "chakra-mcpd",
            "--notion-api-key",
            "secret_test",
            "--schema-root",
            root.as_str(),
            "--namespace",
            "work",
        ]);
        ChakraConfig::try_from(args).expect("config should parse")
    }

    #[tokio::test]
    async fn in_memory_backend_stores_and_fetches() {
        let dir = TempDir::new().expect("tempdir");
        let config = test_config(&dir);

        let memory = build_memory(&config).await.expect("in-memory engine");
        memory
            .store("notion.database_index", json!({ "Tasks": "db-1" }))
            .await
            .expect("store value");

        let fetched = memory.fetch("notion.database_index").await.expect("fetch value");
        assert_eq!(fetched, Some(json!({ "Tasks": "db-1" })));
        assert_eq!(memory.fetch("missing").await.expect("fetch missing"), None);
    }

    #[tokio::test]
    async fn registry_builds_namespaced_control_planes() {
        let dir = TempDir::new().expect("tempdir");
        let config = test_config(&dir);
        let memory = build_memory(&config).await.expect("in-memory engine");
        let gateway = build_gateway(&config).expect("gateway");
        let registry = build_registry(&config, gateway, memory);

        let handle = registry.get_or_init("work").await.expect("namespace builds");
        assert_eq!(handle.control().namespace(), "work");
        assert_eq!(handle.store().root(), dir.path());
        assert!(!dir.path().join("work").exists(), "namespace directory is created on first save");
    }
}
