use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    BlockChildrenRequest,
    CreatePageRequest,
    GatewayError,
    GatewayResult,
    QueryDatabaseRequest,
    RemoteGateway,
    SearchRequest,
    UpdatePageRequest,
};

/// Suspends between retry attempts. Swappable so tests can run on a fake
/// clock.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed()
    }
}

/// Bounded exponential backoff for remote calls.
///
/// The delay after failed attempt `n` (1-based) is `multiplier * 2^(n-1)`,
/// clamped to `[min_delay, max_delay]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub multiplier: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier: Duration::from_secs(1),
            min_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: Duration) -> Self {
        self.multiplier = multiplier;
        self
    }

    #[must_use]
    pub const fn with_delay_bounds(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.multiplier
            .saturating_mul(factor)
            .max(self.min_delay)
            .min(self.max_delay)
    }

    /// Runs `call` until it succeeds, fails with a non-transient error, or the
    /// attempt ceiling is reached.
    ///
    /// # Errors
    /// Returns the first non-transient error unchanged, or
    /// `GatewayError::Exhausted` wrapping the last transient error.
    pub async fn run<T, F, Fut>(
        &self,
        sleeper: &dyn Sleeper,
        operation: &'static str,
        mut call: F,
    ) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "remote call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) if attempt >= attempts => {
                    warn!(operation, attempts, "remote call exhausted retries: {err}");
                    return Err(GatewayError::Exhausted {
                        operation,
                        attempts,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        ?delay,
                        "transient remote failure, retrying: {err}"
                    );
                    sleeper.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Gateway decorator applying a [`RetryPolicy`] to every remote call.
pub struct RetryingGateway<G> {
    inner: G,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl<G: RemoteGateway> RetryingGateway<G> {
    #[must_use]
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    #[must_use]
    pub const fn inner(&self) -> &G {
        &self.inner
    }
}

impl<G: RemoteGateway> RemoteGateway for RetryingGateway<G> {
    fn list_databases(&self) -> BoxFuture<'_, GatewayResult<Vec<Value>>> {
        self.policy
            .run(self.sleeper.as_ref(), "list_databases", || self.inner.list_databases())
            .boxed()
    }

    fn get_database<'a>(&'a self, database_id: &'a str) -> BoxFuture<'a, GatewayResult<Value>> {
        self.policy
            .run(self.sleeper.as_ref(), "get_database", move || {
                self.inner.get_database(database_id)
            })
            .boxed()
    }

    fn query_database<'a>(
        &'a self,
        request: &'a QueryDatabaseRequest,
    ) -> BoxFuture<'a, GatewayResult<Value>> {
        self.policy
            .run(self.sleeper.as_ref(), "query_database", move || {
                self.inner.query_database(request)
            })
            .boxed()
    }

    fn search<'a>(&'a self, request: &'a SearchRequest) -> BoxFuture<'a, GatewayResult<Value>> {
        self.policy
            .run(self.sleeper.as_ref(), "search", move || self.inner.search(request))
            .boxed()
    }

    fn create_page<'a>(
        &'a self,
        request: &'a CreatePageRequest,
    ) -> BoxFuture<'a, GatewayResult<Value>> {
        self.policy
            .run(self.sleeper.as_ref(), "create_page", move || {
                self.inner.create_page(request)
            })
            .boxed()
    }

    fn update_page<'a>(
        &'a self,
        request: &'a UpdatePageRequest,
    ) -> BoxFuture<'a, GatewayResult<Value>> {
        self.policy
            .run(self.sleeper.as_ref(), "update_page", move || {
                self.inner.update_page(request)
            })
            .boxed()
    }

    fn get_block_children<'a>(
        &'a self,
        request: &'a BlockChildrenRequest,
    ) -> BoxFuture<'a, GatewayResult<Value>> {
        self.policy
            .run(self.sleeper.as_ref(), "get_block_children", move || {
                self.inner.get_block_children(request)
            })
            .boxed()
    }

    fn append_block_children<'a>(
        &'a self,
        block_id: &'a str,
        children: &'a [Value],
    ) -> BoxFuture<'a, GatewayResult<Value>> {
        self.policy
            .run(self.sleeper.as_ref(), "append_block_children", move || {
                self.inner.append_block_children(block_id, children)
            })
            .boxed()
    }

    fn update_block<'a>(
        &'a self,
        block_id: &'a str,
        payload: &'a Value,
    ) -> BoxFuture<'a, GatewayResult<Value>> {
        self.policy
            .run(self.sleeper.as_ref(), "update_block", move || {
                self.inner.update_block(block_id, payload)
            })
            .boxed()
    }

    fn delete_block<'a>(&'a self, block_id: &'a str) -> BoxFuture<'a, GatewayResult<Value>> {
        self.policy
            .run(self.sleeper.as_ref(), "delete_block", move || {
                self.inner.delete_block(block_id)
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn slept(&self) -> Vec<Duration> {
            self.slept.lock().expect("sleeper lock").clone()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
            self.slept.lock().expect("sleeper lock").push(duration);
            futures::future::ready(()).boxed()
        }
    }

    fn unavailable() -> GatewayError {
        GatewayError::Status {
            status: 503,
            message: "service unavailable".to_string(),
        }
    }

    #[test]
    fn default_schedule_is_clamped_between_floor_and_ceiling() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=6).map(|attempt| policy.delay_for(attempt).as_secs()).collect();
        assert_eq!(delays, vec![4, 4, 4, 8, 10, 10]);
    }

    #[test]
    fn schedule_doubles_from_the_multiplier_without_a_floor() {
        let policy =
            RetryPolicy::default().with_delay_bounds(Duration::ZERO, Duration::from_secs(10));
        let delays: Vec<u64> = (1..=5).map(|attempt| policy.delay_for(attempt).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 10]);
    }

    #[test]
    fn huge_retry_numbers_saturate_at_ceiling() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(64), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result = policy
            .run(&sleeper, "list_databases", || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move { if call < 2 { Err(unavailable()) } else { Ok(call) } }
            })
            .await;

        assert_eq!(result.expect("third attempt succeeds"), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.slept(),
            vec![Duration::from_secs(4), Duration::from_secs(4)]
        );
    }

    #[tokio::test]
    async fn terminal_failures_are_not_retried() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let result: GatewayResult<()> = RetryPolicy::default()
            .run(&sleeper, "get_database", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(GatewayError::Status {
                        status: 404,
                        message: "not found".to_string(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(GatewayError::Status { status: 404, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.slept().is_empty());
    }

    #[tokio::test]
    async fn exhaustion_propagates_typed_error() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let result: GatewayResult<()> = RetryPolicy::new(4)
            .run(&sleeper, "list_databases", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(unavailable()) }
            })
            .await;

        match result {
            Err(GatewayError::Exhausted {
                operation,
                attempts,
                last,
            }) => {
                assert_eq!(operation, "list_databases");
                assert_eq!(attempts, 4);
                assert!(last.is_transient());
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(sleeper.slept().len(), 3);
    }

    /// Gateway that fails discovery with 503 a fixed number of times and
    /// answers every other call with 404.
    struct FlakyGateway {
        outages: u32,
        list_calls: AtomicU32,
        other_calls: AtomicU32,
    }

    impl FlakyGateway {
        fn failing_first(outages: u32) -> Self {
            Self {
                outages,
                list_calls: AtomicU32::new(0),
                other_calls: AtomicU32::new(0),
            }
        }

        fn not_found(&self) -> BoxFuture<'_, GatewayResult<Value>> {
            self.other_calls.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Err(GatewayError::Status {
                status: 404,
                message: "object_not_found".to_string(),
            }))
            .boxed()
        }
    }

    impl RemoteGateway for FlakyGateway {
        fn list_databases(&self) -> BoxFuture<'_, GatewayResult<Vec<Value>>> {
            let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
            let result = if call < self.outages {
                Err(unavailable())
            } else {
                Ok(vec![serde_json::json!({ "id": "A1" })])
            };
            futures::future::ready(result).boxed()
        }

        fn get_database<'a>(&'a self, _: &'a str) -> BoxFuture<'a, GatewayResult<Value>> {
            self.not_found()
        }

        fn query_database<'a>(
            &'a self,
            _: &'a QueryDatabaseRequest,
        ) -> BoxFuture<'a, GatewayResult<Value>> {
            self.not_found()
        }

        fn search<'a>(&'a self, _: &'a SearchRequest) -> BoxFuture<'a, GatewayResult<Value>> {
            self.not_found()
        }

        fn create_page<'a>(
            &'a self,
            _: &'a CreatePageRequest,
        ) -> BoxFuture<'a, GatewayResult<Value>> {
            self.not_found()
        }

        fn update_page<'a>(
            &'a self,
            _: &'a UpdatePageRequest,
        ) -> BoxFuture<'a, GatewayResult<Value>> {
            self.not_found()
        }

        fn get_block_children<'a>(
            &'a self,
            _: &'a BlockChildrenRequest,
        ) -> BoxFuture<'a, GatewayResult<Value>> {
            self.not_found()
        }

        fn append_block_children<'a>(
            &'a self,
            _: &'a str,
            _: &'a [Value],
        ) -> BoxFuture<'a, GatewayResult<Value>> {
            self.not_found()
        }

        fn update_block<'a>(
            &'a self,
            _: &'a str,
            _: &'a Value,
        ) -> BoxFuture<'a, GatewayResult<Value>> {
            self.not_found()
        }

        fn delete_block<'a>(&'a self, _: &'a str) -> BoxFuture<'a, GatewayResult<Value>> {
            self.not_found()
        }
    }

    #[tokio::test]
    async fn decorator_retries_discovery_through_outages() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let gateway = RetryingGateway::new(FlakyGateway::failing_first(2), RetryPolicy::default())
            .with_sleeper(sleeper.clone());

        let databases = gateway.list_databases().await.expect("third attempt succeeds");

        assert_eq!(databases.len(), 1);
        assert_eq!(gateway.inner().list_calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.slept(),
            vec![Duration::from_secs(4), Duration::from_secs(4)]
        );
    }

    #[tokio::test]
    async fn decorator_passes_terminal_errors_through_once() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let gateway = RetryingGateway::new(FlakyGateway::failing_first(0), RetryPolicy::default())
            .with_sleeper(sleeper.clone());

        let err = gateway.get_database("missing").await.expect_err("404 is terminal");

        assert!(matches!(err, GatewayError::Status { status: 404, .. }));
        assert_eq!(gateway.inner().other_calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.slept().is_empty());
    }

    #[tokio::test]
    async fn decorator_gives_up_after_the_attempt_ceiling() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let flaky = FlakyGateway::failing_first(u32::MAX);
        let gateway =
            RetryingGateway::new(flaky, RetryPolicy::default()).with_sleeper(sleeper.clone());

        let err = gateway.list_databases().await.expect_err("outage outlasts retries");

        assert!(matches!(
            err,
            GatewayError::Exhausted { operation: "list_databases", attempts: 3, .. }
        ));
        assert_eq!(gateway.inner().list_calls.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.slept().len(), 2);
    }
}
