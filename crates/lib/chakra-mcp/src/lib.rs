//! MCP server implementation for chakra-mcp.
//!
//! This crate wires per-namespace control planes into rmcp tool handlers and
//! exposes schema sync, content, block, and planning tools.

mod helpers;
mod tools;
pub mod server;

use std::sync::Arc;

use chakra_core::control::ChakraControlPlane;
use chakra_core::services::NamespaceRegistry;
use rmcp::{
    ErrorData,
    ServerHandler,
    handler::server::tool::ToolRouter,
    tool,
    tool_handler,
    tool_router,
};
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};

const SERVER_INSTRUCTIONS: &str = r"chakra-mcp exposes a Notion workspace as MCP tools and keeps a local cache of database schemas.

Workflow:
1. Call `sync_schemas` once to discover every shared database. This caches each schema under the
   active `namespace` (defaults to the server's namespace) and publishes a name -> id index.
2. Inspect structure with `list_schemas` and `get_schema` before writing pages. `get_schema` reads
   the cache and runs one sync on a miss.
3. Read and write content:
   - `list_databases`, `get_database`, `query_database`, `search`.
   - `create_page`, `update_page`, `get_block_children`.
   - `create_blocks`, `update_block`, `delete_block` for page bodies.
4. Planning shortcuts resolve their target database by name from the cache:
   `create_task`, `create_project`, `create_pillar`, `create_key_result`.

Notes:
- Namespaces partition the schema cache; use `list_namespaces` to see existing ones.
- Database names are matched exactly; when two databases share a name the last one discovered wins.
- Use `help` for the command list. `health` returns `ok`.";

/// MCP server wrapper around the namespace registry and tool routers.
#[derive(Clone)]
pub struct ChakraMcp {
    tool_router: ToolRouter<Self>,
    registry: Arc<NamespaceRegistry>,
    default_namespace: String,
}

impl ChakraMcp {
    /// Creates a new server using a registry by value.
    #[must_use]
    pub fn new(registry: NamespaceRegistry, default_namespace: impl Into<String>) -> Self {
        Self::with_registry(Arc::new(registry), default_namespace)
    }

    /// Creates a new server using a shared registry handle.
    #[must_use]
    pub fn with_registry(
        registry: Arc<NamespaceRegistry>,
        default_namespace: impl Into<String>,
    ) -> Self {
        let tool_router = Self::tool_router_core()
            + Self::tool_router_schemas()
            + Self::tool_router_content()
            + Self::tool_router_blocks()
            + Self::tool_router_planning()
            + Self::tool_router_context();
        Self {
            tool_router,
            registry,
            default_namespace: default_namespace.into(),
        }
    }

    #[must_use]
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    /// Retrieves the control plane for a namespace, initializing it if needed.
    /// A missing or blank namespace selects the server default.
    pub(crate) async fn control_for(
        &self,
        namespace: Option<&str>,
    ) -> Result<ChakraControlPlane, ErrorData> {
        let namespace = helpers::non_blank(namespace).unwrap_or(&self.default_namespace);
        let handle = self
            .registry
            .get_or_init(namespace)
            .await
            .map_err(helpers::map_registry_err)?;
        Ok(handle.control())
    }
}

#[tool_router(router = tool_router_core, vis = "pub")]
impl ChakraMcp {
    #[tool(description = "Health check. Returns 'ok'.")]
    async fn health(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text("ok")]))
    }
}

#[tool_handler]
impl ServerHandler for ChakraMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
