use chakra_core::gateway::{
    BlockChildrenRequest,
    CreatePageRequest,
    QueryDatabaseRequest,
    SearchRequest,
    UpdatePageRequest,
};
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ChakraMcp, helpers};

/// Parameters for fetching one database.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetDatabaseParams {
    pub database_id: String,
}

/// Parameters for querying database rows.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct QueryDatabaseParams {
    pub database_id: String,
    /// Remote filter object, passed through unchanged.
    pub filter: Option<Value>,
    /// Remote sort list, passed through unchanged.
    pub sorts: Option<Value>,
    pub start_cursor: Option<String>,
    pub page_size: Option<u32>,
}

/// Parameters for a workspace search.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SearchParams {
    pub query: Option<String>,
    pub filter: Option<Value>,
    pub sort: Option<Value>,
    pub start_cursor: Option<String>,
    pub page_size: Option<u32>,
}

/// Parameters for creating a page inside a database.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreatePageParams {
    pub database_id: String,
    /// Property values keyed by property name.
    pub properties: Value,
    /// Optional body blocks.
    pub children: Option<Vec<Value>>,
}

/// Parameters for updating page properties.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UpdatePageParams {
    pub page_id: String,
    pub properties: Value,
    pub archived: Option<bool>,
}

/// Parameters for listing child blocks.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetBlockChildrenParams {
    pub block_id: String,
    pub start_cursor: Option<String>,
    pub page_size: Option<u32>,
}

#[tool_router(router = tool_router_content, vis = "pub")]
impl ChakraMcp {
    #[tool(description = "List every database shared with the integration, with full property descriptors.")]
    async fn list_databases(&self) -> Result<CallToolResult, ErrorData> {
        let control = self.control_for(None).await?;
        let databases = control.list_databases().await.map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(databases)?]))
    }

    #[tool(description = "Retrieve a database by id.")]
    async fn get_database(
        &self,
        Parameters(params): Parameters<GetDatabaseParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control_for(None).await?;
        let database = control
            .get_database(&params.database_id)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(database)?]))
    }

    #[tool(description = "Query a database with optional filter, sorts, and pagination.")]
    async fn query_database(
        &self,
        Parameters(params): Parameters<QueryDatabaseParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control_for(None).await?;
        let results = control
            .query_database(&QueryDatabaseRequest {
                database_id: params.database_id,
                filter: params.filter,
                sorts: params.sorts,
                start_cursor: params.start_cursor,
                page_size: params.page_size,
            })
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(results)?]))
    }

    #[tool(description = "Search pages and databases by title.")]
    async fn search(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control_for(None).await?;
        let results = control
            .search(&SearchRequest {
                query: params.query,
                filter: params.filter,
                sort: params.sort,
                start_cursor: params.start_cursor,
                page_size: params.page_size,
            })
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(results)?]))
    }

    #[tool(description = "Create a page in a database. Use get_schema to see which properties the database expects.")]
    async fn create_page(
        &self,
        Parameters(params): Parameters<CreatePageParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control_for(None).await?;
        let page = control
            .create_page(&CreatePageRequest {
                database_id: params.database_id,
                properties: params.properties,
                children: params.children.unwrap_or_default(),
            })
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(page)?]))
    }

    #[tool(description = "Update page properties, or archive the page.")]
    async fn update_page(
        &self,
        Parameters(params): Parameters<UpdatePageParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control_for(None).await?;
        let page = control
            .update_page(&UpdatePageRequest {
                page_id: params.page_id,
                properties: params.properties,
                archived: params.archived.unwrap_or(false),
            })
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(page)?]))
    }

    #[tool(description = "List the child blocks of a page or block.")]
    async fn get_block_children(
        &self,
        Parameters(params): Parameters<GetBlockChildrenParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control_for(None).await?;
        let children = control
            .get_block_children(&BlockChildrenRequest {
                block_id: params.block_id,
                start_cursor: params.start_cursor,
                page_size: params.page_size,
            })
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(children)?]))
    }
}
