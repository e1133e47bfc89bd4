use std::collections::BTreeMap;

use chakra_store::models::{Database, DatabaseIndex};

/// Maps each database's plain-text name to its identifier.
///
/// Names are unique by convention only: when two databases share a name the
/// one appearing later in `databases` wins.
#[must_use]
pub fn build_index(databases: &[Database]) -> DatabaseIndex {
    let mut index = DatabaseIndex::new();
    for database in databases {
        index.insert(database.plain_text_name().to_string(), database.id.clone());
    }
    index
}

/// Returns every name claimed by more than one distinct identifier, with the
/// identifiers in input order.
#[must_use]
pub fn find_collisions(databases: &[Database]) -> BTreeMap<String, Vec<String>> {
    let mut claims: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for database in databases {
        let ids = claims.entry(database.plain_text_name()).or_default();
        if !ids.contains(&database.id.as_str()) {
            ids.push(database.id.as_str());
        }
    }

    claims
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(name, ids)| (name.to_string(), ids.into_iter().map(str::to_string).collect()))
        .collect()
}
