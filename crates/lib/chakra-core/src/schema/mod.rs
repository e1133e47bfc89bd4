//! Schema extraction and name indexing over remote databases.

mod index;

pub use index::{build_index, find_collisions};

use chakra_store::models::{Database, PropertySchema, SchemaRecord};
use serde_json::{Map, Value};

/// Normalizes a validated database into a schema record.
///
/// The title is the plain text of the first title span (empty when there is
/// none). Each field keeps its type tag and the configuration stored under
/// that tag, or an empty object when the descriptor carries none.
#[must_use]
pub fn extract(database: &Database) -> SchemaRecord {
    let properties = database
        .properties
        .iter()
        .map(|(name, descriptor)| {
            let config = descriptor
                .type_config()
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()));
            (
                name.clone(),
                PropertySchema {
                    field_type: descriptor.field_type.clone(),
                    config,
                },
            )
        })
        .collect();

    SchemaRecord {
        id: database.id.clone(),
        title: database.plain_text_name().to_string(),
        properties,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chakra_store::models::{FieldDescriptor, FieldType, RichText};
    use serde_json::json;

    pub(crate) fn database(id: &str, title: &str) -> Database {
        let spans = if title.is_empty() {
            json!([])
        } else {
            json!([{ "type": "text", "plain_text": title }])
        };
        Database::from_value(json!({
            "id": id,
            "created_time": "2024-05-01T12:00:00Z",
            "title": spans,
        }))
        .expect("fixture database")
    }

    /// Rebuilds a database whose shape matches a previously extracted record.
    fn database_from_record(record: &SchemaRecord) -> Database {
        let mut database = database(&record.id, "");
        if !record.title.is_empty() {
            database.title = vec![RichText::plain(record.title.clone())];
        }
        for (name, property) in &record.properties {
            let mut settings = Map::new();
            settings.insert(property.field_type.as_str().to_string(), property.config.clone());
            database.properties.insert(
                name.clone(),
                FieldDescriptor {
                    id: None,
                    name: Some(name.clone()),
                    field_type: property.field_type.clone(),
                    settings,
                },
            );
        }
        database
    }

    fn tasks_database() -> Database {
        Database::from_value(json!({
            "id": "A1",
            "created_time": "2024-05-01T12:00:00Z",
            "title": [
                { "type": "text", "plain_text": "Tasks" },
                { "type": "text", "plain_text": " (archive)" }
            ],
            "properties": {
                "Name": { "id": "title", "name": "Name", "type": "title", "title": {} },
                "Priority": {
                    "id": "p",
                    "name": "Priority",
                    "type": "select",
                    "select": { "options": [{ "name": "P1" }, { "name": "P2" }] }
                },
                "Done": { "id": "d", "name": "Done", "type": "checkbox" }
            }
        }))
        .expect("tasks database")
    }

    #[test]
    fn extract_uses_first_title_span_and_type_configs() {
        let record = extract(&tasks_database());

        assert_eq!(record.id, "A1");
        assert_eq!(record.title, "Tasks");
        assert_eq!(record.properties.len(), 3);
        assert_eq!(record.properties["Priority"].field_type, FieldType::Select);
        assert_eq!(
            record.properties["Priority"].config,
            json!({ "options": [{ "name": "P1" }, { "name": "P2" }] })
        );
        assert_eq!(record.properties["Done"].field_type, FieldType::Checkbox);
        assert_eq!(record.properties["Done"].config, json!({}));
    }

    #[test]
    fn extract_handles_empty_title() {
        let record = extract(&database("Z9", ""));
        assert_eq!(record.title, "");
        assert!(record.properties.is_empty());
    }

    #[test]
    fn extract_does_not_mutate_input() {
        let source = tasks_database();
        let before = source.clone();
        let _ = extract(&source);
        assert_eq!(source, before);
    }

    #[test]
    fn reextracting_an_extracted_shape_is_stable() {
        let record = extract(&tasks_database());
        let rebuilt = database_from_record(&record);
        assert_eq!(extract(&rebuilt), record);
    }
}
