use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Rich text span as returned by the remote API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RichText {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl RichText {
    /// Builds a plain text span with no annotations.
    #[must_use]
    pub fn plain(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            kind: Some("text".to_string()),
            text: Some(serde_json::json!({ "content": content.clone(), "link": null })),
            annotations: None,
            plain_text: Some(content),
            href: None,
        }
    }
}

/// Type tag carried by a database field descriptor.
///
/// Tags the remote reports that are not known here are preserved verbatim in
/// [`FieldType::Other`] so their configuration can still be located.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Title,
    RichText,
    Number,
    Select,
    MultiSelect,
    Status,
    Date,
    People,
    Files,
    Checkbox,
    Url,
    Email,
    PhoneNumber,
    Formula,
    Relation,
    Rollup,
    CreatedTime,
    CreatedBy,
    LastEditedTime,
    LastEditedBy,
    UniqueId,
    Button,
    Verification,
    Other(String),
}

impl FieldType {
    /// Returns the wire tag, which is also the key of the type-specific
    /// configuration inside a field descriptor.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Title => "title",
            Self::RichText => "rich_text",
            Self::Number => "number",
            Self::Select => "select",
            Self::MultiSelect => "multi_select",
            Self::Status => "status",
            Self::Date => "date",
            Self::People => "people",
            Self::Files => "files",
            Self::Checkbox => "checkbox",
            Self::Url => "url",
            Self::Email => "email",
            Self::PhoneNumber => "phone_number",
            Self::Formula => "formula",
            Self::Relation => "relation",
            Self::Rollup => "rollup",
            Self::CreatedTime => "created_time",
            Self::CreatedBy => "created_by",
            Self::LastEditedTime => "last_edited_time",
            Self::LastEditedBy => "last_edited_by",
            Self::UniqueId => "unique_id",
            Self::Button => "button",
            Self::Verification => "verification",
            Self::Other(tag) => tag.as_str(),
        }
    }
}

impl From<String> for FieldType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "title" => Self::Title,
            "rich_text" => Self::RichText,
            "number" => Self::Number,
            "select" => Self::Select,
            "multi_select" => Self::MultiSelect,
            "status" => Self::Status,
            "date" => Self::Date,
            "people" => Self::People,
            "files" => Self::Files,
            "checkbox" => Self::Checkbox,
            "url" => Self::Url,
            "email" => Self::Email,
            "phone_number" => Self::PhoneNumber,
            "formula" => Self::Formula,
            "relation" => Self::Relation,
            "rollup" => Self::Rollup,
            "created_time" => Self::CreatedTime,
            "created_by" => Self::CreatedBy,
            "last_edited_time" => Self::LastEditedTime,
            "last_edited_by" => Self::LastEditedBy,
            "unique_id" => Self::UniqueId,
            "button" => Self::Button,
            "verification" => Self::Verification,
            _ => Self::Other(tag),
        }
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field descriptor of a remote database.
///
/// The type-specific configuration lives under the key named by the type tag
/// and is kept, together with any other unrecognized keys, in `settings`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl FieldDescriptor {
    /// Returns the configuration stored under the descriptor's own type tag.
    #[must_use]
    pub fn type_config(&self) -> Option<&Value> {
        self.settings.get(self.field_type.as_str())
    }
}

/// Remote database as validated at the gateway boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Database {
    pub id: String,
    #[serde(default)]
    pub title: Vec<RichText>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub description: Vec<RichText>,
    #[serde(default)]
    pub properties: BTreeMap<String, FieldDescriptor>,
    #[serde(default)]
    pub archived: bool,
    pub created_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Database {
    /// Validates a raw remote payload into a database.
    ///
    /// # Errors
    /// Returns the deserialization error when the payload does not match the
    /// expected database shape.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Plain text of the first title span, or an empty string.
    #[must_use]
    pub fn plain_text_name(&self) -> &str {
        self.title
            .first()
            .and_then(|span| span.plain_text.as_deref())
            .unwrap_or_default()
    }
}

/// Normalized type and configuration of one database field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub config: Value,
}

/// Normalized, persisted projection of a remote database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
}

/// Name to identifier mapping produced by a sync pass.
pub type DatabaseIndex = BTreeMap<String, String>;

/// Outcome of one sync pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncReport {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub index: DatabaseIndex,
    #[serde(default)]
    pub schemas: Vec<String>,
}
