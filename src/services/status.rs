use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

use crate::models::status::UserStatus;
use crate::repositories::api::ApiError;
use crate::repositories::auth::AuthApi;

pub const DEFAULT_REFRESH_COOLDOWN: Duration = Duration::from_secs(3);

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, token: &str) -> Result<UserStatus, ApiError>;
}

#[async_trait]
impl StatusSource for AuthApi {
    async fn fetch_status(&self, token: &str) -> Result<UserStatus, ApiError> {
        self.check_status(token).await
    }
}

#[derive(Default)]
struct StatusCache {
    status: Option<UserStatus>,
    last_query: Option<Instant>,
    loading: bool,
}

/// In-memory cache of the user's onboarding status with a throttled refresh.
///
/// Queries are serialized through `query_gate`, so callers that overlap a
/// running query wait for it and then see its result through the cooldown
/// check instead of issuing their own request.
#[derive(Clone)]
pub struct StatusResolver {
    source: Arc<dyn StatusSource>,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    cache: Arc<RwLock<StatusCache>>,
    query_gate: Arc<Mutex<()>>,
}

impl StatusResolver {
    pub fn new(source: Arc<dyn StatusSource>, cooldown: Duration) -> Self {
        Self::with_clock(source, Arc::new(SystemClock), cooldown)
    }

    pub fn with_clock(
        source: Arc<dyn StatusSource>,
        clock: Arc<dyn Clock>,
        cooldown: Duration,
    ) -> Self {
        Self {
            source,
            clock,
            cooldown,
            cache: Arc::new(RwLock::new(StatusCache::default())),
            query_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Always queries. Failures resolve to [`UserStatus::pessimistic`] and
    /// are cached like any other answer.
    pub async fn check_status(&self, token: &str) -> UserStatus {
        let _gate = self.query_gate.lock().await;
        self.query(token).await
    }

    /// Like [`check_status`](Self::check_status) but a no-op returning the
    /// cached value when the last query started less than `cooldown` ago.
    pub async fn refresh_status(&self, token: &str) -> UserStatus {
        let _gate = self.query_gate.lock().await;
        {
            let cache = self.cache.read().await;
            if let (Some(status), Some(last_query)) = (&cache.status, cache.last_query) {
                if self.clock.now().saturating_duration_since(last_query) < self.cooldown {
                    log::debug!("Status refresh skipped, within cooldown");
                    return status.clone();
                }
            }
        }

        self.query(token).await
    }

    async fn query(&self, token: &str) -> UserStatus {
        {
            let mut cache = self.cache.write().await;
            cache.last_query = Some(self.clock.now());
            cache.loading = true;
        }

        let status = match self.source.fetch_status(token).await {
            Ok(status) => {
                log::info!(
                    "Status resolved: verified={}, description={}, missing={:?}",
                    status.is_verified,
                    status.has_description,
                    status.missing
                );
                status
            }
            Err(e) => {
                log::error!("Status check failed, assuming nothing is complete: {}", e);
                UserStatus::pessimistic()
            }
        };

        let mut cache = self.cache.write().await;
        cache.status = Some(status.clone());
        cache.loading = false;
        status
    }

    pub async fn cached(&self) -> Option<UserStatus> {
        self.cache.read().await.status.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.cache.read().await.loading
    }

    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        *cache = StatusCache::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::status::Requirement;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    struct ManualClock {
        now: StdMutex<Instant>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: StdMutex::new(Instant::now()),
            }
        }

        fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusSource for CountingSource {
        async fn fetch_status(&self, _token: &str) -> Result<UserStatus, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail {
                return Err(ApiError::Decode("boom".to_string()));
            }
            Ok(UserStatus {
                is_verified: true,
                has_description: true,
                missing: BTreeSet::new(),
                guidance: None,
            })
        }
    }

    fn resolver(source: Arc<CountingSource>, clock: Arc<ManualClock>) -> StatusResolver {
        StatusResolver::with_clock(source, clock, Duration::from_secs(3))
    }

    #[tokio::test]
    async fn refresh_within_cooldown_issues_one_query() {
        let source = Arc::new(CountingSource::new(false));
        let clock = Arc::new(ManualClock::new());
        let resolver = resolver(source.clone(), clock.clone());

        resolver.refresh_status("t").await;
        clock.advance(Duration::from_secs(1));
        let status = resolver.refresh_status("t").await;

        assert_eq!(source.calls(), 1);
        assert!(status.all_requirements_met());

        clock.advance(Duration::from_secs(3));
        resolver.refresh_status("t").await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn overlapping_refreshes_collapse() {
        let source = Arc::new(CountingSource::new(false));
        let clock = Arc::new(ManualClock::new());
        let resolver = resolver(source.clone(), clock);

        let (a, b) = tokio::join!(resolver.refresh_status("t"), resolver.refresh_status("t"));

        assert_eq!(source.calls(), 1);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn failure_falls_back_to_pessimistic_default() {
        let source = Arc::new(CountingSource::new(true));
        let clock = Arc::new(ManualClock::new());
        let resolver = resolver(source, clock);

        let status = resolver.check_status("t").await;

        assert!(status.is_missing(Requirement::EmailVerification));
        assert!(status.is_missing(Requirement::UserDescription));
        assert_eq!(resolver.cached().await, Some(status));
        assert!(!resolver.is_loading().await);
    }

    #[tokio::test]
    async fn check_status_ignores_cooldown_and_clear_forgets() {
        let source = Arc::new(CountingSource::new(false));
        let clock = Arc::new(ManualClock::new());
        let resolver = resolver(source.clone(), clock);

        resolver.check_status("t").await;
        resolver.check_status("t").await;
        assert_eq!(source.calls(), 2);

        resolver.clear().await;
        assert!(resolver.cached().await.is_none());
        resolver.refresh_status("t").await;
        assert_eq!(source.calls(), 3);
    }
}
