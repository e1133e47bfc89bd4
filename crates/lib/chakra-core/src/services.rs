use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};

use crate::control::ChakraControlPlane;
use crate::store::SchemaStore;

pub type BuildHandleFuture =
    Pin<Box<dyn Future<Output = Result<Arc<NamespaceHandle>, RegistryError>> + Send + 'static>>;
pub type BuildHandleFn = Arc<dyn Fn(String) -> BuildHandleFuture + Send + Sync + 'static>;

/// Configuration for the namespace registry cache and builder.
#[derive(Clone)]
pub struct NamespaceRegistryConfig {
    pub ttl: Option<Duration>,
    pub sweep_interval: Duration,
    pub max_entries: Option<usize>,
    pub build_handle: BuildHandleFn,
}

impl NamespaceRegistryConfig {
    #[must_use]
    pub fn new(build_handle: BuildHandleFn) -> Self {
        Self {
            ttl: None,
            sweep_interval: Duration::from_secs(60),
            max_entries: None,
            build_handle,
        }
    }

    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub const fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    #[must_use]
    pub const fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }
}

#[derive(Debug)]
pub enum RegistryError {
    InvalidNamespace(String),
    CapacityReached { max: usize },
    BuildFailed(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNamespace(namespace) => write!(f, "invalid namespace: {namespace:?}"),
            Self::CapacityReached { max } => {
                write!(f, "namespace registry capacity reached (max {max})")
            }
            Self::BuildFailed(message) => write!(f, "failed to build namespace handle: {message}"),
        }
    }
}

impl Error for RegistryError {}

/// Shared services for a single configuration namespace.
#[derive(Clone)]
pub struct NamespaceHandle {
    control: ChakraControlPlane,
}

impl NamespaceHandle {
    #[must_use]
    pub const fn new(control: ChakraControlPlane) -> Self {
        Self { control }
    }

    #[must_use]
    pub const fn store(&self) -> &SchemaStore {
        self.control.store()
    }

    #[must_use]
    pub fn control(&self) -> ChakraControlPlane {
        self.control.clone()
    }
}

/// Registry of lazily built, per-namespace control planes.
#[derive(Clone)]
pub struct NamespaceRegistry {
    inner: Arc<NamespaceRegistryInner>,
}

/// Internal registry state shared across clones.
struct NamespaceRegistryInner {
    entries: RwLock<HashMap<String, Arc<NamespaceEntry>>>,
    config: NamespaceRegistryConfig,
}

/// Cache entry that tracks a namespace handle and last access time.
struct NamespaceEntry {
    handle: OnceCell<Arc<NamespaceHandle>>,
    last_used_ms: AtomicU64,
}

impl NamespaceEntry {
    fn new() -> Self {
        Self {
            handle: OnceCell::new(),
            last_used_ms: AtomicU64::new(now_ms()),
        }
    }

    fn touch(&self) {
        self.last_used_ms.store(now_ms(), Ordering::Relaxed);
    }

    fn idle_for(&self, now_ms: u64) -> Duration {
        let last = self.last_used_ms.load(Ordering::Relaxed);
        Duration::from_millis(now_ms.saturating_sub(last))
    }
}

impl NamespaceRegistry {
    #[must_use]
    pub fn new(config: NamespaceRegistryConfig) -> Self {
        Self {
            inner: Arc::new(NamespaceRegistryInner {
                entries: RwLock::new(HashMap::new()),
                config,
            }),
        }
    }

    /// Returns the handle for `namespace`, building it on first use.
    ///
    /// Concurrent callers for the same namespace share one build.
    ///
    /// # Errors
    /// Returns `RegistryError` if the namespace name is invalid, the registry
    /// is full, or the handle cannot be built.
    pub async fn get_or_init(
        &self,
        namespace: &str,
    ) -> Result<Arc<NamespaceHandle>, RegistryError> {
        let namespace = namespace.trim();
        if !is_valid_namespace(namespace) {
            return Err(RegistryError::InvalidNamespace(namespace.to_string()));
        }

        let entry = {
            let map = self.inner.entries.read().await;
            map.get(namespace).cloned()
        };

        let entry = match entry {
            Some(entry) => entry,
            None => {
                let mut map = self.inner.entries.write().await;
                if let Some(entry) = map.get(namespace).cloned() {
                    entry
                } else {
                    if let Some(max_entries) = self.inner.config.max_entries
                        && map.len() >= max_entries
                    {
                        return Err(RegistryError::CapacityReached { max: max_entries });
                    }
                    let entry = Arc::new(NamespaceEntry::new());
                    map.insert(namespace.to_string(), entry.clone());
                    entry
                }
            }
        };

        entry.touch();

        let build_handle = self.inner.config.build_handle.clone();
        let handle = entry
            .handle
            .get_or_try_init(|| {
                debug!(namespace, "building namespace handle");
                (build_handle)(namespace.to_string())
            })
            .await?;
        Ok(handle.clone())
    }

    /// Namespaces with a live handle in this process.
    pub async fn list_namespaces(&self) -> Vec<String> {
        let map = self.inner.entries.read().await;
        let mut namespaces: Vec<String> = map.keys().cloned().collect();
        namespaces.sort();
        namespaces
    }

    pub async fn evict_idle(&self) -> usize {
        let Some(ttl) = self.inner.config.ttl else {
            return 0;
        };
        let now = now_ms();
        let mut map = self.inner.entries.write().await;
        let before = map.len();
        map.retain(|_, entry| entry.idle_for(now) <= ttl);
        let evicted = before.saturating_sub(map.len());
        if evicted > 0 {
            info!(evicted, "evicted idle namespace handles");
        }
        evicted
    }

    #[must_use]
    pub fn spawn_sweeper(self) -> Option<tokio::task::JoinHandle<()>> {
        self.inner.config.ttl?;
        let interval = self.inner.config.sweep_interval;
        let registry = self;
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let _ = registry.evict_idle().await;
            }
        }))
    }
}

/// A namespace must be one non-empty path segment.
fn is_valid_namespace(namespace: &str) -> bool {
    let mut components = Path::new(namespace).components();
    !namespace.is_empty()
        && !namespace.contains(['/', '\\'])
        && matches!(
            (components.next(), components.next()),
            (Some(std::path::Component::Normal(_)), None)
        )
}

fn now_ms() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    u64::try_from(millis).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::FutureExt;
    use futures::future::BoxFuture;
    use serde_json::Value;

    use crate::gateway::{
        BlockChildrenRequest,
        CreatePageRequest,
        GatewayError,
        GatewayResult,
        QueryDatabaseRequest,
        RemoteGateway,
        SearchRequest,
        UpdatePageRequest,
    };
    use crate::memory::InMemoryMemory;

    struct OfflineGateway;

    fn offline<'a, T: Send + 'a>() -> BoxFuture<'a, GatewayResult<T>> {
        futures::future::ready(Err(GatewayError::Transport("offline".to_string()))).boxed()
    }

    impl RemoteGateway for OfflineGateway {
        fn list_databases(&self) -> BoxFuture<'_, GatewayResult<Vec<Value>>> {
            offline()
        }
        fn get_database<'a>(&'a self, _: &'a str) -> BoxFuture<'a, GatewayResult<Value>> {
            offline()
        }
        fn query_database<'a>(
            &'a self,
            _: &'a QueryDatabaseRequest,
        ) -> BoxFuture<'a, GatewayResult<Value>> {
            offline()
        }
        fn search<'a>(&'a self, _: &'a SearchRequest) -> BoxFuture<'a, GatewayResult<Value>> {
            offline()
        }
        fn create_page<'a>(
            &'a self,
            _: &'a CreatePageRequest,
        ) -> BoxFuture<'a, GatewayResult<Value>> {
            offline()
        }
        fn update_page<'a>(
            &'a self,
            _: &'a UpdatePageRequest,
        ) -> BoxFuture<'a, GatewayResult<Value>> {
            offline()
        }
        fn get_block_children<'a>(
            &'a self,
            _: &'a BlockChildrenRequest,
        ) -> BoxFuture<'a, GatewayResult<Value>> {
            offline()
        }
        fn append_block_children<'a>(
            &'a self,
            _: &'a str,
            _: &'a [Value],
        ) -> BoxFuture<'a, GatewayResult<Value>> {
            offline()
        }
        fn update_block<'a>(
            &'a self,
            _: &'a str,
            _: &'a Value,
        ) -> BoxFuture<'a, GatewayResult<Value>> {
            offline()
        }
        fn delete_block<'a>(&'a self, _: &'a str) -> BoxFuture<'a, GatewayResult<Value>> {
            offline()
        }
    }

    fn build_test_registry(
        calls: Arc<AtomicUsize>,
        root: &Path,
        ttl: Option<Duration>,
        max_entries: Option<usize>,
    ) -> NamespaceRegistry {
        let root = root.to_path_buf();
        let gateway: Arc<dyn RemoteGateway> = Arc::new(OfflineGateway);
        let memory = Arc::new(InMemoryMemory::new());
        let build: BuildHandleFn = Arc::new(move |namespace: String| {
            let calls = calls.clone();
            let root = root.clone();
            let gateway = gateway.clone();
            let memory = memory.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                let store = SchemaStore::new(root, namespace)
                    .map_err(|err| RegistryError::BuildFailed(err.to_string()))?;
                Ok::<_, RegistryError>(Arc::new(NamespaceHandle::new(
                    ChakraControlPlane::new(gateway, memory, store),
                )))
            }) as BuildHandleFuture
        });

        let mut config = NamespaceRegistryConfig::new(build);
        if let Some(ttl) = ttl {
            config = config.with_ttl(ttl).with_sweep_interval(Duration::from_millis(1));
        }
        if let Some(max_entries) = max_entries {
            config = config.with_max_entries(max_entries);
        }
        NamespaceRegistry::new(config)
    }

    #[tokio::test]
    async fn registry_single_flight() {
        let dir = tempfile::tempdir().expect("tempdir");
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = build_test_registry(calls.clone(), dir.path(), None, None);

        let r1 = registry.clone();
        let r2 = registry.clone();
        let (left, right) = tokio::join!(r1.get_or_init("work"), r2.get_or_init("work"));
        let left = left.expect("left handle");
        let right = right.expect("right handle");
        assert!(Arc::ptr_eq(&left, &right));
        assert_eq!(left.store().namespace(), "work");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn registry_evicts_idle_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let calls = Arc::new(AtomicUsize::new(0));
        let registry =
            build_test_registry(calls, dir.path(), Some(Duration::from_millis(1)), None);

        let _ = registry.get_or_init("default").await.expect("handle");
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(registry.evict_idle().await, 1);
        assert!(registry.list_namespaces().await.is_empty());
    }

    #[tokio::test]
    async fn registry_enforces_capacity_and_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = build_test_registry(calls, dir.path(), None, Some(1));

        registry.get_or_init("default").await.expect("first namespace");
        assert!(matches!(
            registry.get_or_init("work").await,
            Err(RegistryError::CapacityReached { max: 1 })
        ));
        for bad in ["", "a/b", "..", "."] {
            assert!(matches!(
                registry.get_or_init(bad).await,
                Err(RegistryError::InvalidNamespace(_))
            ));
        }
        assert_eq!(registry.list_namespaces().await, vec!["default".to_string()]);
    }
}
