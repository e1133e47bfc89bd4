pub const TABLE_MEMORY: &str = "memory";

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_INDEX_KEY: &str = "notion.database_index";
pub const DEFAULT_SCHEMA_PREFIX: &str = "notion.schema";

pub const SCHEMA_FILE_EXTENSION: &str = "json";

/// Memory-service key for a database schema: `{prefix}.{database_id}`.
#[must_use]
pub fn make_schema_key(prefix: &str, database_id: &str) -> String {
    format!("{prefix}.{database_id}")
}
