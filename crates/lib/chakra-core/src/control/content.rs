use serde_json::Value;
use tracing::info;

use crate::gateway::{
    BlockChildrenRequest,
    CreatePageRequest,
    QueryDatabaseRequest,
    SearchRequest,
    UpdatePageRequest,
};

use super::{ChakraControlPlane, ControlError, require};

impl ChakraControlPlane {
    /// Lists every reachable database as returned by the remote.
    ///
    /// # Errors
    /// Returns `ControlError::Gateway` if the remote call fails.
    pub async fn list_databases(&self) -> Result<Vec<Value>, ControlError> {
        Ok(self.gateway.list_databases().await?)
    }

    /// # Errors
    /// Returns `ControlError` if the id is blank or the remote call fails.
    pub async fn get_database(&self, database_id: &str) -> Result<Value, ControlError> {
        let database_id = require(database_id, "database_id")?;
        Ok(self.gateway.get_database(database_id).await?)
    }

    /// # Errors
    /// Returns `ControlError` if the id is blank or the remote call fails.
    pub async fn query_database(
        &self,
        request: &QueryDatabaseRequest,
    ) -> Result<Value, ControlError> {
        require(&request.database_id, "database_id")?;
        Ok(self.gateway.query_database(request).await?)
    }

    /// # Errors
    /// Returns `ControlError::Gateway` if the remote call fails.
    pub async fn search(&self, request: &SearchRequest) -> Result<Value, ControlError> {
        Ok(self.gateway.search(request).await?)
    }

    /// # Errors
    /// Returns `ControlError` if the target database is blank or the remote
    /// call fails.
    pub async fn create_page(&self, request: &CreatePageRequest) -> Result<Value, ControlError> {
        require(&request.database_id, "database_id")?;
        let page = self.gateway.create_page(request).await?;
        info!(database = %request.database_id, "created page");
        Ok(page)
    }

    /// # Errors
    /// Returns `ControlError` if the page id is blank or the remote call fails.
    pub async fn update_page(&self, request: &UpdatePageRequest) -> Result<Value, ControlError> {
        require(&request.page_id, "page_id")?;
        let page = self.gateway.update_page(request).await?;
        info!(page = %request.page_id, "updated page");
        Ok(page)
    }

    /// # Errors
    /// Returns `ControlError` if the block id is blank or the remote call fails.
    pub async fn get_block_children(
        &self,
        request: &BlockChildrenRequest,
    ) -> Result<Value, ControlError> {
        require(&request.block_id, "block_id")?;
        Ok(self.gateway.get_block_children(request).await?)
    }

    /// Appends blocks as children of an existing block or page.
    ///
    /// # Errors
    /// Returns `ControlError` if the block id is blank, no blocks are given,
    /// or the remote call fails.
    pub async fn append_blocks(
        &self,
        block_id: &str,
        children: &[Value],
    ) -> Result<Value, ControlError> {
        let block_id = require(block_id, "block_id")?;
        if children.is_empty() {
            return Err(ControlError::InvalidInput("at least one block is required".to_string()));
        }
        let response = self.gateway.append_block_children(block_id, children).await?;
        info!(block = block_id, count = children.len(), "appended blocks");
        Ok(response)
    }

    /// # Errors
    /// Returns `ControlError` if the block id is blank or the remote call fails.
    pub async fn update_block(
        &self,
        block_id: &str,
        payload: &Value,
    ) -> Result<Value, ControlError> {
        let block_id = require(block_id, "block_id")?;
        if !payload.is_object() {
            return Err(ControlError::InvalidInput("block_data must be an object".to_string()));
        }
        let response = self.gateway.update_block(block_id, payload).await?;
        info!(block = block_id, "updated block");
        Ok(response)
    }

    /// # Errors
    /// Returns `ControlError` if the block id is blank or the remote call fails.
    pub async fn delete_block(&self, block_id: &str) -> Result<Value, ControlError> {
        let block_id = require(block_id, "block_id")?;
        let response = self.gateway.delete_block(block_id).await?;
        info!(block = block_id, "deleted block");
        Ok(response)
    }
}
