use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::{ChakraMcp, helpers};

/// Parameters for running a schema sync pass.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SyncSchemasParams {
    /// Memory key for the name -> id index. Defaults to the server setting.
    pub index_key: Option<String>,
    /// Prefix for per-database memory keys. Defaults to the server setting.
    pub schema_prefix: Option<String>,
    pub namespace: Option<String>,
}

/// Parameters for fetching one cached schema.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetSchemaParams {
    /// Database name as shown in the workspace.
    pub name: String,
    pub namespace: Option<String>,
}

/// Parameters scoped to a namespace only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NamespaceParams {
    pub namespace: Option<String>,
}

#[tool_router(router = tool_router_schemas, vis = "pub")]
impl ChakraMcp {
    #[tool(description = "Discover all databases, rebuild the name index, and cache every schema. Returns success, per-item errors, the index, and stored schema names.")]
    async fn sync_schemas(
        &self,
        Parameters(params): Parameters<SyncSchemasParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control_for(params.namespace.as_deref()).await?;
        let defaults = control.sync_config().clone();
        let index_key =
            helpers::non_blank(params.index_key.as_deref()).unwrap_or(&defaults.index_key);
        let schema_prefix =
            helpers::non_blank(params.schema_prefix.as_deref()).unwrap_or(&defaults.schema_prefix);
        let report = control
            .sync(index_key, schema_prefix)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(report)?]))
    }

    #[tool(description = "Fetch a cached database schema by name. Runs one sync on a cache miss; returns null if the database does not exist.")]
    async fn get_schema(
        &self,
        Parameters(params): Parameters<GetSchemaParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control_for(params.namespace.as_deref()).await?;
        let record = control.get_schema(&params.name).await.map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(record)?]))
    }

    #[tool(description = "List schema names cached in a namespace.")]
    async fn list_schemas(
        &self,
        Parameters(params): Parameters<NamespaceParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control_for(params.namespace.as_deref()).await?;
        let names = control.list_schemas().await.map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(names)?]))
    }

    #[tool(description = "List every namespace that has cached schemas.")]
    async fn list_namespaces(&self) -> Result<CallToolResult, ErrorData> {
        let control = self.control_for(None).await?;
        let namespaces = control.list_namespaces().await.map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(namespaces)?]))
    }
}
