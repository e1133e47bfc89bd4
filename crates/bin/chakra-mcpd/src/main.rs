//! Daemon entry point for the chakra MCP server.
//!
//! Loads configuration from flags, environment and an optional TOML file,
//! connects the memory service and Notion gateway, and serves MCP over stdio
//! or streamable HTTP.

mod config;
mod registry;

use std::sync::Arc;

use chakra_core::services::NamespaceRegistry;
use chakra_mcp::server::{McpHttpServerConfig, serve_stdio, serve_streamable_http};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ChakraConfig;
use crate::registry::{build_gateway, build_memory, build_registry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // stdout carries the stdio transport, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chakra=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ChakraConfig::from_args()?;
    let memory = build_memory(&config).await?;
    let gateway = build_gateway(&config)?;
    let registry = build_registry(&config, gateway, memory);
    let _sweeper = registry.clone().spawn_sweeper();
    let registry = Arc::new(registry);

    if config.sync_on_start {
        sync_on_start(&registry, &config.default_namespace).await;
    }

    if config.enable_stdio {
        info!(namespace = %config.default_namespace, "serving MCP over stdio");
        serve_stdio(registry, config.default_namespace).await
    } else {
        serve_streamable_http(
            registry,
            config.default_namespace,
            McpHttpServerConfig::new(config.mcp_http_addr),
        )
        .await
    }
}

async fn sync_on_start(registry: &NamespaceRegistry, namespace: &str) {
    let handle = match registry.get_or_init(namespace).await {
        Ok(handle) => handle,
        Err(err) => {
            warn!(namespace, error = %err, "startup sync skipped");
            return;
        }
    };
    match handle.control().sync_default().await {
        Ok(report) if report.success => {
            info!(namespace, schemas = report.schemas.len(), "startup sync complete");
        }
        Ok(report) => {
            warn!(
                namespace,
                schemas = report.schemas.len(),
                errors = ?report.errors,
                "startup sync finished with errors"
            );
        }
        Err(err) => warn!(namespace, error = %err, "startup sync failed"),
    }
}
