use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::{error::Error, fmt, io};

use chakra_store::models::SchemaRecord;
use chakra_store::schema::SCHEMA_FILE_EXTENSION;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Serialize(serde_json::Error),
    InvalidInput(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "schema store I/O error: {err}"),
            Self::Serialize(err) => write!(f, "schema serialization error: {err}"),
            Self::InvalidInput(message) => write!(f, "Invalid input: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// File-backed schema cache bound to one configuration namespace.
///
/// Records live at `<root>/<namespace>/<schema name>.json`. The namespace
/// directory is created on the first save and never removed.
#[derive(Debug, Clone)]
pub struct SchemaStore {
    root: PathBuf,
    namespace: String,
    dir: PathBuf,
}

impl SchemaStore {
    /// Binds a store to `namespace` under `root`.
    ///
    /// # Errors
    /// Returns `StoreError::InvalidInput` if the namespace is empty or is not a
    /// single path segment.
    pub fn new(root: impl Into<PathBuf>, namespace: impl Into<String>) -> StoreResult<Self> {
        let root = root.into();
        let namespace = namespace.into();
        ensure_segment(&namespace, "namespace")?;
        let dir = root.join(&namespace);
        Ok(Self {
            root,
            namespace,
            dir,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn schema_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{SCHEMA_FILE_EXTENSION}"))
    }

    /// Writes a schema record, replacing any previous value for `name`.
    ///
    /// The record is staged in a hidden file and renamed into place, so a
    /// reader sees either the old record or the new one.
    ///
    /// # Errors
    /// Returns `StoreError` if the name is invalid, serialization fails, or the
    /// filesystem write fails.
    pub async fn save(&self, name: &str, record: &SchemaRecord) -> StoreResult<()> {
        ensure_segment(name, "schema name")?;
        let payload = serde_json::to_vec_pretty(record)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let target = self.schema_path(name);
        let staging = self
            .dir
            .join(format!(".{name}.{}.tmp", Uuid::new_v4().simple()));
        if let Err(err) = write_then_rename(&staging, &target, &payload).await {
            let _ = tokio::fs::remove_file(&staging).await;
            error!(namespace = %self.namespace, schema = name, "failed to save schema: {err}");
            return Err(err.into());
        }

        info!(namespace = %self.namespace, schema = name, "saved schema");
        Ok(())
    }

    /// Reads a schema record.
    ///
    /// Returns `None` when the schema was never saved. Unreadable or corrupt
    /// files are logged and also reported as `None`.
    pub async fn load(&self, name: &str) -> Option<SchemaRecord> {
        if let Err(err) = ensure_segment(name, "schema name") {
            warn!(namespace = %self.namespace, "rejected schema lookup: {err}");
            return None;
        }

        let path = self.schema_path(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(namespace = %self.namespace, schema = name, "no cached schema");
                return None;
            }
            Err(err) => {
                error!(namespace = %self.namespace, schema = name, "failed to read schema: {err}");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(err) => {
                error!(namespace = %self.namespace, schema = name, "corrupt schema file: {err}");
                None
            }
        }
    }

    /// Lists schema names saved in this namespace.
    ///
    /// # Errors
    /// Returns `StoreError::Io` if the namespace directory cannot be read.
    pub async fn list_names(&self) -> StoreResult<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        let Some(mut entries) = read_dir_if_exists(&self.dir).await? else {
            return Ok(names);
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(SCHEMA_FILE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            names.insert(stem.to_string());
        }
        Ok(names)
    }

    /// Lists every namespace that has a partition under `root`.
    ///
    /// # Errors
    /// Returns `StoreError::Io` if the root directory cannot be read.
    pub async fn list_namespaces(root: &Path) -> StoreResult<BTreeSet<String>> {
        let mut namespaces = BTreeSet::new();
        let Some(mut entries) = read_dir_if_exists(root).await? else {
            return Ok(namespaces);
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            if let Some(name) = file_name.to_str()
                && !name.starts_with('.')
            {
                namespaces.insert(name.to_string());
            }
        }
        Ok(namespaces)
    }
}

async fn write_then_rename(staging: &Path, target: &Path, payload: &[u8]) -> io::Result<()> {
    tokio::fs::write(staging, payload).await?;
    tokio::fs::rename(staging, target).await
}

async fn read_dir_if_exists(dir: &Path) -> io::Result<Option<tokio::fs::ReadDir>> {
    match tokio::fs::read_dir(dir).await {
        Ok(entries) => Ok(Some(entries)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

fn ensure_segment(value: &str, field: &str) -> StoreResult<()> {
    if value.trim().is_empty() {
        return Err(StoreError::InvalidInput(format!("{field} is required")));
    }
    if value == "." || value == ".." || value.contains(['/', '\\', '\0']) {
        return Err(StoreError::InvalidInput(format!(
            "{field} must be a single path segment: {value}"
        )));
    }
    Ok(())
}
