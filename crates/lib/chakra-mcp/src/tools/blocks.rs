use chakra_core::blocks::{self, Annotations};
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

/// Text styling flags for a block's text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TextStyle {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub strikethrough: Option<bool>,
    pub underline: Option<bool>,
    pub code: Option<bool>,
    pub color: Option<String>,
}

impl From<TextStyle> for Annotations {
    fn from(style: TextStyle) -> Self {
        Self {
            bold: style.bold,
            italic: style.italic,
            strikethrough: style.strikethrough,
            underline: style.underline,
            code: style.code,
            color: style.color,
        }
    }
}

/// One block to append. `raw` passes a prebuilt block object through.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockSpec {
    Paragraph {
        content: String,
        style: Option<TextStyle>,
        link: Option<String>,
    },
    #[serde(rename = "heading_1")]
    Heading1 { content: String },
    #[serde(rename = "heading_2")]
    Heading2 { content: String },
    #[serde(rename = "heading_3")]
    Heading3 { content: String },
    BulletedListItem {
        content: String,
        style: Option<TextStyle>,
    },
    NumberedListItem {
        content: String,
        style: Option<TextStyle>,
    },
    ToDo {
        content: String,
        #[serde(default)]
        checked: bool,
    },
    Toggle {
        content: String,
        #[serde(default)]
        children: Vec<BlockSpec>,
    },
    Code {
        content: String,
        language: Option<String>,
    },
    Callout {
        content: String,
        emoji: Option<String>,
    },
    Raw { block: Value },
}

impl BlockSpec {
    /// Builds the remote block payload.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Paragraph {
                content,
                style,
                link,
            } => {
                let annotations = style.map(Annotations::from);
                blocks::paragraph(&content, annotations.as_ref(), link.as_deref())
            }
            Self::Heading1 { content } => blocks::heading(1, &content),
            Self::Heading2 { content } => blocks::heading(2, &content),
            Self::Heading3 { content } => blocks::heading(3, &content),
            Self::BulletedListItem { content, style } => {
                blocks::bulleted_list_item(&content, style.map(Annotations::from).as_ref())
            }
            Self::NumberedListItem { content, style } => {
                blocks::numbered_list_item(&content, style.map(Annotations::from).as_ref())
            }
            Self::ToDo { content, checked } => blocks::to_do(&content, checked),
            Self::Toggle { content, children } => blocks::toggle(
                &content,
                children.into_iter().map(Self::into_value).collect(),
            ),
            Self::Code { content, language } => blocks::code(&content, language.as_deref()),
            Self::Callout { content, emoji } => blocks::callout(&content, emoji.as_deref()),
            Self::Raw { block } => block,
        }
    }
}

/// Parameters for appending blocks.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateBlocksParams {
    /// Page or block to append to.
    pub block_id: String,
    pub blocks: Vec<BlockSpec>,
}

/// Parameters for updating a block.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UpdateBlockParams {
    pub block_id: String,
    /// Block fields to update, e.g. `{"paragraph": {"rich_text": [...]}}`.
    pub block_data: Value,
}

/// Parameters for deleting a block.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DeleteBlockParams {
    pub block_id: String,
}

#[tool_router(router = tool_router_blocks, vis = "pub")]
impl ChakraMcp {
    #[tool(description = "Append blocks (paragraph, heading_1-3, list items, to_do, toggle, code, callout, or raw) under a page or block.")]
    async fn create_blocks(
        &self,
        Parameters(params): Parameters<CreateBlocksParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let children: Vec<Value> = params.blocks.into_iter().map(BlockSpec::into_value).collect();
        let control = self.control_for(None).await?;
        let response = control
            .append_blocks(&params.block_id, &children)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(response)?]))
    }

    #[tool(description = "Update an existing block.")]
    async fn update_block(
        &self,
        Parameters(params): Parameters<UpdateBlockParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control_for(None).await?;
        let response = control
            .update_block(&params.block_id, &params.block_data)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(response)?]))
    }

    #[tool(description = "Delete (archive) a block.")]
    async fn delete_block(
        &self,
        Parameters(params): Parameters<DeleteBlockParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control_for(None).await?;
        let response = control
            .delete_block(&params.block_id)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(response)?]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn block_specs_deserialize_by_type_tag() {
        let specs: Vec<BlockSpec> = serde_json::from_value(json!([
            { "type": "heading_2", "content": "Plan" },
            { "type": "to_do", "content": "Book venue" },
            { "type": "toggle", "content": "Details", "children": [
                { "type": "code", "content": "cargo test", "language": "shell" }
            ]},
            { "type": "paragraph", "content": "Done", "style": { "italic": true } }
        ]))
        .expect("specs");

        let values: Vec<Value> = specs.into_iter().map(BlockSpec::into_value).collect();
        assert_eq!(values[0]["type"], "heading_2");
        assert_eq!(values[1]["to_do"]["checked"], false);
        assert_eq!(values[2]["toggle"]["children"][0]["code"]["language"], "shell");
        assert_eq!(
            values[3]["paragraph"]["rich_text"][0]["annotations"],
            json!({ "italic": true })
        );
    }

    #[test]
    fn raw_blocks_pass_through() {
        let raw = json!({ "object": "block", "type": "divider", "divider": {} });
        let spec = BlockSpec::Raw { block: raw.clone() };
        assert_eq!(spec.into_value(), raw);
    }
}
