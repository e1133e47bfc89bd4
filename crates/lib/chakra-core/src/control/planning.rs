//! Planning helpers that create tasks, projects, pillars, and key results as
//! pages in their respective databases.
//!
//! Target databases are named in [`PlanningDatabases`] and resolved to ids
//! through the schema cache, falling back to the published name index.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::gateway::CreatePageRequest;

use super::{ChakraControlPlane, ControlError, require};

/// Names of the databases planning pages are created in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningDatabases {
    pub tasks: String,
    pub projects: String,
    pub pillars: String,
    pub key_results: String,
}

impl Default for PlanningDatabases {
    fn default() -> Self {
        Self {
            tasks: "Tasks".to_string(),
            projects: "Projects".to_string(),
            pillars: "Pillars".to_string(),
            key_results: "Key Results".to_string(),
        }
    }
}

pub const DEFAULT_STATUS: &str = "Not Started";
pub const DEFAULT_PRIORITY: &str = "P2";
pub const DEFAULT_PILLAR_STATUS: &str = "Active";
pub const DEFAULT_UNIT: &str = "%";

fn not_started() -> String {
    DEFAULT_STATUS.to_string()
}

fn default_priority() -> String {
    DEFAULT_PRIORITY.to_string()
}

fn active() -> String {
    DEFAULT_PILLAR_STATUS.to_string()
}

fn percent() -> String {
    DEFAULT_UNIT.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRequest {
    pub title: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "not_started")]
    pub status: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectRequest {
    pub title: String,
    #[serde(default)]
    pub pillar_id: Option<String>,
    #[serde(default)]
    pub key_result_id: Option<String>,
    #[serde(default = "not_started")]
    pub status: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PillarRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "active")]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyResultRequest {
    pub title: String,
    pub objective_id: String,
    pub target_value: f64,
    #[serde(default)]
    pub current_value: f64,
    #[serde(default = "percent")]
    pub unit: String,
    #[serde(default = "not_started")]
    pub status: String,
}

fn title_property(title: &str) -> Value {
    json!({ "title": [{ "text": { "content": title } }] })
}

fn select_property(name: &str) -> Value {
    json!({ "select": { "name": name } })
}

fn relation_property(id: &str) -> Value {
    json!({ "relation": [{ "id": id }] })
}

fn date_property(start: &str) -> Value {
    json!({ "date": { "start": start } })
}

/// Inserts `key` only when the optional value is present and not blank.
fn insert_some(
    properties: &mut Map<String, Value>,
    key: &str,
    value: Option<&str>,
    build: fn(&str) -> Value,
) {
    if let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) {
        properties.insert(key.to_string(), build(value));
    }
}

pub(crate) fn task_properties(request: &TaskRequest) -> Value {
    let mut properties = Map::new();
    properties.insert("Name".to_string(), title_property(&request.title));
    properties.insert("Status".to_string(), select_property(&request.status));
    properties.insert("Priority".to_string(), select_property(&request.priority));
    insert_some(&mut properties, "Project", request.project_id.as_deref(), relation_property);
    insert_some(&mut properties, "Due Date", request.due_date.as_deref(), date_property);
    Value::Object(properties)
}

pub(crate) fn project_properties(request: &ProjectRequest) -> Value {
    let mut properties = Map::new();
    properties.insert("Name".to_string(), title_property(&request.title));
    properties.insert("Status".to_string(), select_property(&request.status));
    properties.insert("Priority".to_string(), select_property(&request.priority));
    insert_some(&mut properties, "Pillar", request.pillar_id.as_deref(), relation_property);
    insert_some(&mut properties, "Key Result", request.key_result_id.as_deref(), relation_property);
    insert_some(&mut properties, "Due Date", request.due_date.as_deref(), date_property);
    Value::Object(properties)
}

pub(crate) fn pillar_properties(request: &PillarRequest) -> Value {
    let mut properties = Map::new();
    properties.insert("Name".to_string(), title_property(&request.title));
    properties.insert("Status".to_string(), select_property(&request.status));
    insert_some(&mut properties, "Description", request.description.as_deref(), |text| {
        json!({ "rich_text": [{ "text": { "content": text } }] })
    });
    Value::Object(properties)
}

pub(crate) fn key_result_properties(request: &KeyResultRequest) -> Value {
    json!({
        "Name": title_property(&request.title),
        "Objective": relation_property(&request.objective_id),
        "Target Value": { "number": request.target_value },
        "Current Value": { "number": request.current_value },
        "Unit": select_property(&request.unit),
        "Status": select_property(&request.status),
    })
}

impl ChakraControlPlane {
    #[must_use]
    pub const fn planning(&self) -> &PlanningDatabases {
        &self.planning
    }

    /// Resolves a database name to its id using the cached schema first and
    /// the published name index second.
    ///
    /// # Errors
    /// Returns `ControlError::InvalidInput` if neither source knows the name,
    /// or `ControlError::Memory` if the index cannot be fetched.
    pub async fn resolve_database_id(&self, name: &str) -> Result<String, ControlError> {
        require(name, "database name")?;
        if let Some(record) = self.store.load(name).await {
            debug!(database = name, id = %record.id, "resolved database from schema cache");
            return Ok(record.id);
        }

        let index = self.memory.fetch(&self.config.index_key).await?;
        index
            .as_ref()
            .and_then(|index| index.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ControlError::InvalidInput(format!(
                    "no database named '{name}' is cached; run sync_schemas first"
                ))
            })
    }

    async fn create_in(
        &self,
        database: &str,
        kind: &str,
        title: &str,
        properties: Value,
    ) -> Result<Value, ControlError> {
        require(title, "title")?;
        let database_id = self.resolve_database_id(database).await?;
        info!(kind, title, database = %database_id, "creating planning page");
        self.create_page(&CreatePageRequest {
            database_id,
            properties,
            children: Vec::new(),
        })
        .await
    }

    /// # Errors
    /// Returns `ControlError` if the title is blank, the tasks database is not
    /// cached, or the remote call fails.
    pub async fn create_task(&self, request: &TaskRequest) -> Result<Value, ControlError> {
        let database = self.planning.tasks.clone();
        self.create_in(&database, "task", &request.title, task_properties(request)).await
    }

    /// # Errors
    /// Returns `ControlError` if the title is blank, the projects database is
    /// not cached, or the remote call fails.
    pub async fn create_project(&self, request: &ProjectRequest) -> Result<Value, ControlError> {
        let database = self.planning.projects.clone();
        self.create_in(&database, "project", &request.title, project_properties(request)).await
    }

    /// # Errors
    /// Returns `ControlError` if the title is blank, the pillars database is
    /// not cached, or the remote call fails.
    pub async fn create_pillar(&self, request: &PillarRequest) -> Result<Value, ControlError> {
        let database = self.planning.pillars.clone();
        self.create_in(&database, "pillar", &request.title, pillar_properties(request)).await
    }

    /// # Errors
    /// Returns `ControlError` if the title or objective is blank, the key
    /// results database is not cached, or the remote call fails.
    pub async fn create_key_result(
        &self,
        request: &KeyResultRequest,
    ) -> Result<Value, ControlError> {
        require(&request.objective_id, "objective_id")?;
        let database = self.planning.key_results.clone();
        self.create_in(&database, "key_result", &request.title, key_result_properties(request))
            .await
    }
}
