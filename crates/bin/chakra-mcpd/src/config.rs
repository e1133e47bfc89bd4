use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chakra_core::control::{PlanningDatabases, SyncConfig};
use chakra_core::gateway::RetryPolicy;
use chakra_core::gateway::notion::{DEFAULT_BASE_URL, DEFAULT_NOTION_VERSION};
use chakra_store::schema::{DEFAULT_INDEX_KEY, DEFAULT_NAMESPACE, DEFAULT_SCHEMA_PREFIX};
use clap::{Parser, builder::BoolishValueParser};
use serde::Deserialize;

const DEFAULT_SCHEMA_ROOT: &str = ".chakra/schemas";
const DEFAULT_MCP_HTTP_ADDR: &str = "127.0.0.1:4020";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REGISTRY_TTL_SECS: u64 = 300;
const DEFAULT_DB_NAMESPACE: &str = "chakra";
const DEFAULT_DB_NAME: &str = "memory";

#[derive(Parser, Debug)]
#[command(name = "chakra-mcpd", version, about = "Chakra MCP daemon.")]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct CliArgs {
    /// Optional TOML file with planning database names and retry overrides.
    #[arg(long, env = "CHAKRA_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "NOTION_API_KEY", hide_env_values = true)]
    notion_api_key: Option<String>,

    #[arg(long, env = "CHAKRA_NOTION_BASE_URL", default_value = DEFAULT_BASE_URL)]
    notion_base_url: String,

    #[arg(long, env = "CHAKRA_NOTION_VERSION", default_value = DEFAULT_NOTION_VERSION)]
    notion_version: String,

    #[arg(
        long,
        env = "CHAKRA_REQUEST_TIMEOUT_SECS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS
    )]
    request_timeout_secs: u64,

    #[arg(long, env = "CHAKRA_SCHEMA_ROOT", default_value = DEFAULT_SCHEMA_ROOT)]
    schema_root: PathBuf,

    #[arg(long, env = "CHAKRA_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    #[arg(long, env = "CHAKRA_INDEX_KEY", default_value = DEFAULT_INDEX_KEY)]
    index_key: String,

    #[arg(long, env = "CHAKRA_SCHEMA_PREFIX", default_value = DEFAULT_SCHEMA_PREFIX)]
    schema_prefix: String,

    #[arg(long, env = "CHAKRA_RETRY_ATTEMPTS")]
    retry_attempts: Option<u32>,

    #[arg(
        long,
        env = "CHAKRA_REGISTRY_TTL_SECS",
        default_value_t = DEFAULT_REGISTRY_TTL_SECS
    )]
    registry_ttl_secs: u64,

    #[arg(long, env = "CHAKRA_REGISTRY_SWEEP_SECS")]
    registry_sweep_secs: Option<u64>,

    #[arg(long, env = "CHAKRA_REGISTRY_MAX")]
    max_entries: Option<usize>,

    #[arg(
        long = "stdio",
        env = "CHAKRA_ENABLE_STDIO",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    enable_stdio: bool,

    #[arg(long, env = "CHAKRA_MCP_HTTP_ADDR", default_value = DEFAULT_MCP_HTTP_ADDR)]
    mcp_http_addr: SocketAddr,

    #[arg(
        long,
        env = "CHAKRA_SYNC_ON_START",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    sync_on_start: bool,

    #[arg(
        long,
        env = "CHAKRA_DB_IN_MEMORY",
        default_value_t = true,
        value_parser = BoolishValueParser::new()
    )]
    db_in_memory: bool,

    #[arg(long, env = "CHAKRA_DB_URI")]
    db_uri: Option<String>,

    #[arg(long, env = "CHAKRA_DB_USERNAME")]
    db_username: Option<String>,

    #[arg(long, env = "CHAKRA_DB_PASSWORD", hide_env_values = true)]
    db_password: Option<String>,

    #[arg(long, env = "CHAKRA_DB_NAMESPACE", default_value = DEFAULT_DB_NAMESPACE)]
    db_namespace: String,

    #[arg(long, env = "CHAKRA_DB_NAME", default_value = DEFAULT_DB_NAME)]
    db_name: String,
}

/// Settings read from the optional TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    planning: PlanningDatabases,
    retry: RetryOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RetryOverrides {
    max_attempts: Option<u32>,
    multiplier_ms: Option<u64>,
    min_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
}

impl RetryOverrides {
    fn apply(&self, policy: RetryPolicy) -> RetryPolicy {
        let mut policy = policy;
        if let Some(max_attempts) = self.max_attempts {
            policy.max_attempts = max_attempts;
        }
        if let Some(multiplier) = self.multiplier_ms {
            policy = policy.with_multiplier(Duration::from_millis(multiplier));
        }
        let min_delay = self.min_delay_ms.map_or(policy.min_delay, Duration::from_millis);
        let max_delay = self.max_delay_ms.map_or(policy.max_delay, Duration::from_millis);
        policy.with_delay_bounds(min_delay, max_delay)
    }
}

/// Where the external memory service lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryBackend {
    /// In-process `SurrealDB` engine; nothing outlives the daemon.
    InMemory { namespace: String, database: String },
    /// Remote `SurrealDB` reached over websocket.
    Remote {
        uri: String,
        username: String,
        password: String,
        namespace: String,
        database: String,
    },
}

/// Runtime configuration loaded from CLI arguments, environment variables,
/// and the optional TOML file.
#[derive(Clone)]
pub struct ChakraConfig {
    pub api_key: String,
    pub notion_base_url: String,
    pub notion_version: String,
    pub request_timeout: Duration,
    pub schema_root: PathBuf,
    pub default_namespace: String,
    pub sync: SyncConfig,
    pub planning: PlanningDatabases,
    pub retry: RetryPolicy,
    pub memory: MemoryBackend,
    pub registry_ttl: Option<Duration>,
    pub sweep_interval: Duration,
    pub max_entries: Option<usize>,
    pub enable_stdio: bool,
    pub mcp_http_addr: SocketAddr,
    pub sync_on_start: bool,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingSetting(&'static str),
    InvalidSetting { name: &'static str, value: String },
    File { path: PathBuf, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSetting(name) => write!(f, "missing required setting: {name}"),
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
            Self::File { path, message } => {
                write!(f, "failed to load config file {}: {message}", path.display())
            }
        }
    }
}

impl Error for ConfigError {}

impl ChakraConfig {
    /// Parses the process arguments and environment.
    ///
    /// # Errors
    /// Returns `ConfigError` if a required setting is missing or invalid, or
    /// the config file cannot be read.
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let file_error = |message: String| ConfigError::File {
        path: path.to_path_buf(),
        message,
    };
    let text = std::fs::read_to_string(path).map_err(|err| file_error(err.to_string()))?;
    toml::from_str(&text).map_err(|err| file_error(err.to_string()))
}

fn memory_backend(args: &mut CliArgs) -> Result<MemoryBackend, ConfigError> {
    let uri = non_blank(args.db_uri.take());
    let username = non_blank(args.db_username.take());
    let password = non_blank(args.db_password.take());
    let namespace = std::mem::take(&mut args.db_namespace);
    let database = std::mem::take(&mut args.db_name);

    let Some(uri) = uri.filter(|_| !args.db_in_memory) else {
        return Ok(MemoryBackend::InMemory {
            namespace,
            database,
        });
    };
    let username = username.ok_or(ConfigError::MissingSetting("CHAKRA_DB_USERNAME"))?;
    let password = password.ok_or(ConfigError::MissingSetting("CHAKRA_DB_PASSWORD"))?;
    Ok(MemoryBackend::Remote {
        uri,
        username,
        password,
        namespace,
        database,
    })
}

impl TryFrom<CliArgs> for ChakraConfig {
    type Error = ConfigError;

    fn try_from(mut args: CliArgs) -> Result<Self, Self::Error> {
        let api_key = non_blank(args.notion_api_key.take())
            .ok_or(ConfigError::MissingSetting("NOTION_API_KEY"))?;

        let namespace = args.namespace.trim().to_string();
        if namespace.is_empty() || namespace.contains(['/', '\\']) || namespace.starts_with('.') {
            return Err(ConfigError::InvalidSetting {
                name: "CHAKRA_NAMESPACE",
                value: args.namespace,
            });
        }
        for (name, value) in [
            ("CHAKRA_INDEX_KEY", &args.index_key),
            ("CHAKRA_SCHEMA_PREFIX", &args.schema_prefix),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidSetting {
                    name,
                    value: value.clone(),
                });
            }
        }

        let file = match args.config.as_deref() {
            Some(path) => load_file(path)?,
            None => FileConfig::default(),
        };
        let mut retry = file.retry.apply(RetryPolicy::default());
        if let Some(attempts) = args.retry_attempts {
            retry.max_attempts = attempts;
        }
        if retry.max_attempts == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "CHAKRA_RETRY_ATTEMPTS",
                value: "0".to_string(),
            });
        }

        let registry_ttl = if args.registry_ttl_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(args.registry_ttl_secs))
        };
        let sweep_secs = args
            .registry_sweep_secs
            .unwrap_or(args.registry_ttl_secs)
            .max(1);

        let memory = memory_backend(&mut args)?;

        Ok(Self {
            api_key,
            notion_base_url: args.notion_base_url,
            notion_version: args.notion_version,
            request_timeout: Duration::from_secs(args.request_timeout_secs),
            schema_root: args.schema_root,
            default_namespace: namespace,
            sync: SyncConfig::new(args.index_key, args.schema_prefix),
            planning: file.planning,
            retry,
            memory,
            registry_ttl,
            sweep_interval: Duration::from_secs(sweep_secs),
            max_entries: args.max_entries,
            enable_stdio: args.enable_stdio,
            mcp_http_addr: args.mcp_http_addr,
            sync_on_start: args.sync_on_start,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base_args() -> CliArgs {
        CliArgs {
            config: None,
            notion_api_key: Some("secret_test".to_string()),
            notion_base_url: DEFAULT_BASE_URL.to_string(),
            notion_version: DEFAULT_NOTION_VERSION.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            schema_root: PathBuf::from(DEFAULT_SCHEMA_ROOT),
            namespace: DEFAULT_NAMESPACE.to_string(),
            index_key: DEFAULT_INDEX_KEY.to_string(),
            schema_prefix: DEFAULT_SCHEMA_PREFIX.to_string(),
            retry_attempts: None,
            registry_ttl_secs: DEFAULT_REGISTRY_TTL_SECS,
            registry_sweep_secs: None,
            max_entries: None,
            enable_stdio: false,
            mcp_http_addr: DEFAULT_MCP_HTTP_ADDR.parse().expect("valid MCP addr"),
            sync_on_start: false,
            db_in_memory: true,
            db_uri: None,
            db_username: None,
            db_password: None,
            db_namespace: DEFAULT_DB_NAMESPACE.to_string(),
            db_name: DEFAULT_DB_NAME.to_string(),
        }
    }

    #[test]
    fn defaults_produce_in_memory_backend_and_default_retry() {
        let config = ChakraConfig::try_from(base_args()).expect("config should parse");

        assert_eq!(
            config.memory,
            MemoryBackend::InMemory {
                namespace: DEFAULT_DB_NAMESPACE.to_string(),
                database: DEFAULT_DB_NAME.to_string(),
            }
        );
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.sync, SyncConfig::default());
        assert_eq!(config.planning, PlanningDatabases::default());
        assert_eq!(config.registry_ttl, Some(Duration::from_secs(DEFAULT_REGISTRY_TTL_SECS)));
    }

    #[test]
    fn api_key_is_required() {
        let mut args = base_args();
        args.notion_api_key = Some("  ".to_string());
        assert!(matches!(
            ChakraConfig::try_from(args),
            Err(ConfigError::MissingSetting("NOTION_API_KEY"))
        ));
    }

    #[test]
    fn namespace_must_be_a_single_segment() {
        let mut args = base_args();
        args.namespace = "work/secret".to_string();
        assert!(matches!(
            ChakraConfig::try_from(args),
            Err(ConfigError::InvalidSetting { name: "CHAKRA_NAMESPACE", .. })
        ));
    }

    #[test]
    fn remote_memory_requires_credentials() {
        let mut args = base_args();
        args.db_in_memory = false;
        args.db_uri = Some("ws://127.0.0.1:8000".to_string());
        assert!(matches!(
            ChakraConfig::try_from(args),
            Err(ConfigError::MissingSetting("CHAKRA_DB_USERNAME"))
        ));

        let mut args = base_args();
        args.db_in_memory = false;
        args.db_uri = Some("ws://127.0.0.1:8000".to_string());
        args.db_username = Some("root".to_string());
        args.db_password = Some("root".to_string());
        let config = ChakraConfig::try_from(args).expect("remote config");
        assert!(matches!(config.memory, MemoryBackend::Remote { .. }));
    }

    #[test]
    fn file_overrides_planning_names_and_retry() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
[planning]
tasks = "Work Items"

[retry]
max_attempts = 5
min_delay_ms = 500
"#
        )
        .expect("write config");

        let mut args = base_args();
        args.config = Some(file.path().to_path_buf());
        let config = ChakraConfig::try_from(args).expect("config with file");

        assert_eq!(config.planning.tasks, "Work Items");
        assert_eq!(config.planning.projects, "Projects");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.min_delay, Duration::from_millis(500));
        assert_eq!(config.retry.max_delay, Duration::from_secs(10));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[retry]\nattempts = 5").expect("write config");

        let mut args = base_args();
        args.config = Some(file.path().to_path_buf());
        assert!(matches!(ChakraConfig::try_from(args), Err(ConfigError::File { .. })));
    }
}
