use chakra_core::control::{
    DEFAULT_PILLAR_STATUS,
    DEFAULT_PRIORITY,
    DEFAULT_STATUS,
    DEFAULT_UNIT,
    KeyResultRequest,
    PillarRequest,
    ProjectRequest,
    TaskRequest,
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

use crate::{ChakraMcp, helpers};

/// Parameters for creating a task.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateTaskParams {
    pub title: String,
    /// Project page to relate the task to.
    pub project_id: Option<String>,
    /// Defaults to "Not Started".
    pub status: Option<String>,
    /// Defaults to "P2".
    pub priority: Option<String>,
    /// ISO-8601 date.
    pub due_date: Option<String>,
    pub namespace: Option<String>,
}

/// Parameters for creating a project.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateProjectParams {
    pub title: String,
    pub pillar_id: Option<String>,
    pub key_result_id: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub namespace: Option<String>,
}

/// Parameters for creating a pillar.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreatePillarParams {
    pub title: String,
    pub description: Option<String>,
    /// Defaults to "Active".
    pub status: Option<String>,
    pub namespace: Option<String>,
}

/// Parameters for creating a key result.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateKeyResultParams {
    pub title: String,
    /// Objective page the key result measures.
    pub objective_id: String,
    pub target_value: f64,
    /// Defaults to 0.
    pub current_value: Option<f64>,
    /// Defaults to "%".
    pub unit: Option<String>,
    pub status: Option<String>,
    pub namespace: Option<String>,
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl From<CreateTaskParams> for TaskRequest {
    fn from(params: CreateTaskParams) -> Self {
        Self {
            title: params.title,
            project_id: params.project_id,
            status: or_default(params.status, DEFAULT_STATUS),
            priority: or_default(params.priority, DEFAULT_PRIORITY),
            due_date: params.due_date,
        }
    }
}

impl From<CreateProjectParams> for ProjectRequest {
    fn from(params: CreateProjectParams) -> Self {
        Self {
            title: params.title,
            pillar_id: params.pillar_id,
            key_result_id: params.key_result_id,
            status: or_default(params.status, DEFAULT_STATUS),
            priority: or_default(params.priority, DEFAULT_PRIORITY),
            due_date: params.due_date,
        }
    }
}

impl From<CreatePillarParams> for PillarRequest {
    fn from(params: CreatePillarParams) -> Self {
        Self {
            title: params.title,
            description: params.description,
            status: or_default(params.status, DEFAULT_PILLAR_STATUS),
        }
    }
}

impl From<CreateKeyResultParams> for KeyResultRequest {
    fn from(params: CreateKeyResultParams) -> Self {
        Self {
            title: params.title,
            objective_id: params.objective_id,
            target_value: params.target_value,
            current_value: params.current_value.unwrap_or_default(),
            unit: or_default(params.unit, DEFAULT_UNIT),
            status: or_default(params.status, DEFAULT_STATUS),
        }
    }
}

#[tool_router(router = tool_router_planning, vis = "pub")]
impl ChakraMcp {
    #[tool(description = "Create a task in the configured tasks database (resolved by name from the schema cache).")]
    async fn create_task(
        &self,
        Parameters(params): Parameters<CreateTaskParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control_for(params.namespace.as_deref()).await?;
        let page = control
            .create_task(&params.into())
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(page)?]))
    }

    #[tool(description = "Create a project in the configured projects database.")]
    async fn create_project(
        &self,
        Parameters(params): Parameters<CreateProjectParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control_for(params.namespace.as_deref()).await?;
        let page = control
            .create_project(&params.into())
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(page)?]))
    }

    #[tool(description = "Create a pillar in the configured pillars database.")]
    async fn create_pillar(
        &self,
        Parameters(params): Parameters<CreatePillarParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control_for(params.namespace.as_deref()).await?;
        let page = control
            .create_pillar(&params.into())
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(page)?]))
    }

    #[tool(description = "Create a key result linked to an objective in the configured key results database.")]
    async fn create_key_result(
        &self,
        Parameters(params): Parameters<CreateKeyResultParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let control = self.control_for(params.namespace.as_deref()).await?;
        let page = control
            .create_key_result(&params.into())
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(page)?]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_options_fall_back_to_defaults() {
        let request = TaskRequest::from(CreateTaskParams {
            title: "Plan sprint".to_string(),
            project_id: None,
            status: Some(String::new()),
            priority: None,
            due_date: None,
            namespace: None,
        });
        assert_eq!(request.status, DEFAULT_STATUS);
        assert_eq!(request.priority, DEFAULT_PRIORITY);
    }

    #[test]
    fn key_result_defaults() {
        let request = KeyResultRequest::from(CreateKeyResultParams {
            title: "Reach 1k users".to_string(),
            objective_id: "O1".to_string(),
            target_value: 1000.0,
            current_value: None,
            unit: None,
            status: Some("On Track".to_string()),
            namespace: None,
        });
        assert!(request.current_value.abs() < f64::EPSILON);
        assert_eq!(request.unit, DEFAULT_UNIT);
        assert_eq!(request.status, "On Track");
    }
}
