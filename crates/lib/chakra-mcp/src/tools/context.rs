use rmcp::{
    ErrorData,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::ChakraMcp;

/// Payload listing the MCP commands this server offers.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HelpCommands {
    pub default_namespace: String,
    pub commands: Vec<String>,
}

impl HelpCommands {
    fn for_namespace(default_namespace: &str) -> Self {
        let commands = [
            "help - List MCP commands and the active default namespace.",
            "health - Returns ok.",
            "sync_schemas - Discover databases, rebuild the name index, and cache every schema.",
            "get_schema - Fetch a cached schema by database name (syncs once on a miss).",
            "list_schemas - List schema names cached in a namespace.",
            "list_namespaces - List namespaces with cached schemas.",
            "list_databases - List every database shared with the integration.",
            "get_database - Retrieve a database by id.",
            "query_database - Query a database with filter, sorts, and pagination.",
            "search - Search pages and databases by title.",
            "create_page - Create a page in a database.",
            "update_page - Update page properties or archive a page.",
            "get_block_children - List child blocks of a page or block.",
            "create_blocks - Append blocks under a page or block.",
            "update_block - Update a block.",
            "delete_block - Delete a block.",
            "create_task - Create a task in the tasks database.",
            "create_project - Create a project in the projects database.",
            "create_pillar - Create a pillar in the pillars database.",
            "create_key_result - Create a key result in the key results database.",
        ];
        Self {
            default_namespace: default_namespace.to_string(),
            commands: commands.iter().map(|command| (*command).to_string()).collect(),
        }
    }
}

#[tool_router(router = tool_router_context, vis = "pub")]
impl ChakraMcp {
    #[tool(description = "List the MCP commands to get context with how this MCP server works.")]
    async fn help(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::json(
            HelpCommands::for_namespace(self.default_namespace()),
        )?]))
    }
}
