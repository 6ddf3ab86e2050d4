//! Time-windowed cache over the normalized version list.
//!
//! The upstream API is queried at most once per TTL window: the window index
//! is the current time divided by the TTL, and a snapshot computed for one
//! index is served unchanged until the index advances. A failed refresh is
//! propagated for that window rather than falling back to a stale snapshot;
//! the next window retries.

use log::debug;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

use crate::github::ReleaseSource;
use crate::platform::PlatformResolver;

use super::{Version, VersionError, compare, normalize};

/// Clock abstraction so the window index is testable.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall-clock time in milliseconds since the UNIX epoch.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

struct CacheState {
    window: u64,
    snapshot: Arc<Vec<Version>>,
}

/// Caches the sorted version list, refreshing at most once per TTL window.
pub struct VersionCache {
    source: Arc<dyn ReleaseSource>,
    platforms: Arc<dyn PlatformResolver>,
    clock: Arc<dyn Clock>,
    ttl_millis: u64,
    state: Mutex<Option<CacheState>>,
}

impl VersionCache {
    pub fn new(
        source: Arc<dyn ReleaseSource>,
        platforms: Arc<dyn PlatformResolver>,
        ttl: Duration,
    ) -> Self {
        Self::with_clock(source, platforms, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: Arc<dyn ReleaseSource>,
        platforms: Arc<dyn PlatformResolver>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            platforms,
            // A zero TTL would make the window index division panic
            ttl_millis: (ttl.as_millis() as u64).max(1),
            clock,
            state: Mutex::new(None),
        }
    }

    /// The sorted snapshot for the current time window.
    ///
    /// The lock is held across the refresh, so concurrent calls within one
    /// window coalesce into a single upstream fetch and all observe the same
    /// snapshot.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Arc<Vec<Version>>, VersionError> {
        let window = self.clock.now_millis() / self.ttl_millis;

        let mut state = self.state.lock().await;
        if let Some(cached) = state.as_ref() {
            if cached.window == window {
                return Ok(Arc::clone(&cached.snapshot));
            }
        }

        debug!("Version snapshot missing or stale, refreshing window {}", window);
        let snapshot = Arc::new(self.refresh().await?);
        *state = Some(CacheState {
            window,
            snapshot: Arc::clone(&snapshot),
        });

        Ok(snapshot)
    }

    /// Fetch, normalize, and sort the full release list.
    async fn refresh(&self) -> Result<Vec<Version>, VersionError> {
        let releases = self
            .source
            .fetch_releases()
            .await
            .map_err(VersionError::Upstream)?;

        let mut versions = Vec::with_capacity(releases.len());
        for release in releases {
            if let Some(version) = normalize(self.platforms.as_ref(), release)? {
                versions.push(version);
            }
        }

        versions.sort_by(compare);
        debug!("Normalized {} versions from upstream", versions.len());

        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{MockReleaseSource, RawRelease};
    use crate::platform::DefaultPlatformResolver;

    fn make_release(tag: &str) -> RawRelease {
        RawRelease {
            tag_name: tag.to_string(),
            draft: false,
            body: None,
            published_at: Some("2024-01-01T00:00:00Z".to_string()),
            assets: vec![],
        }
    }

    fn cache_with(
        source: MockReleaseSource,
        clock: MockClock,
        ttl: Duration,
    ) -> VersionCache {
        VersionCache::with_clock(
            Arc::new(source),
            Arc::new(DefaultPlatformResolver),
            ttl,
            Arc::new(clock),
        )
    }

    #[tokio::test]
    async fn test_list_sorted_descending() {
        let mut source = MockReleaseSource::new();
        source.expect_fetch_releases().times(1).returning(|| {
            Ok(vec![
                make_release("v1.0.0"),
                make_release("v2.0.0"),
                make_release("v1.5.0"),
            ])
        });

        let mut clock = MockClock::new();
        clock.expect_now_millis().returning(|| 1_000);

        let cache = cache_with(source, clock, Duration::from_secs(60));
        let versions = cache.list().await.unwrap();

        let tags: Vec<_> = versions.iter().map(|v| v.tag.as_str()).collect();
        assert_eq!(tags, vec!["2.0.0", "1.5.0", "1.0.0"]);
    }

    #[tokio::test]
    async fn test_list_drops_drafts() {
        let mut source = MockReleaseSource::new();
        source.expect_fetch_releases().times(1).returning(|| {
            let mut draft = make_release("v3.0.0");
            draft.draft = true;
            draft.published_at = None;
            Ok(vec![draft, make_release("v1.0.0")])
        });

        let mut clock = MockClock::new();
        clock.expect_now_millis().returning(|| 1_000);

        let cache = cache_with(source, clock, Duration::from_secs(60));
        let versions = cache.list().await.unwrap();

        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].tag, "1.0.0");
    }

    #[tokio::test]
    async fn test_same_window_fetches_once() {
        let mut source = MockReleaseSource::new();
        source
            .expect_fetch_releases()
            .times(1)
            .returning(|| Ok(vec![make_release("v1.0.0")]));

        let mut clock = MockClock::new();
        // Two calls at different instants within one 60s window
        clock.expect_now_millis().return_const(10_000u64);

        let cache = cache_with(source, clock, Duration::from_secs(60));
        let first = cache.list().await.unwrap();
        let second = cache.list().await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_new_window_refetches() {
        let mut source = MockReleaseSource::new();
        let mut fetched = vec![
            vec![make_release("v1.0.0")],
            vec![make_release("v1.0.0"), make_release("v2.0.0")],
        ]
        .into_iter();
        source
            .expect_fetch_releases()
            .times(2)
            .returning(move || Ok(fetched.next().unwrap_or_default()));

        let mut clock = MockClock::new();
        let mut instants = vec![10_000u64, 70_000u64].into_iter();
        clock
            .expect_now_millis()
            .times(2)
            .returning(move || instants.next().unwrap_or_default());

        let cache = cache_with(source, clock, Duration::from_secs(60));
        let first = cache.list().await.unwrap();
        let second = cache.list().await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let mut source = MockReleaseSource::new();
        source
            .expect_fetch_releases()
            .times(1)
            .returning(|| Err(anyhow::anyhow!("connection refused")));

        let mut clock = MockClock::new();
        clock.expect_now_millis().returning(|| 1_000);

        let cache = cache_with(source, clock, Duration::from_secs(60));
        let err = cache.list().await.unwrap_err();

        assert!(matches!(err, VersionError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_fetch_failure_no_stale_fallback() {
        let mut source = MockReleaseSource::new();
        let mut results = vec![
            Ok(vec![make_release("v1.0.0")]),
            Err(anyhow::anyhow!("upstream down")),
        ]
        .into_iter();
        source
            .expect_fetch_releases()
            .times(2)
            .returning(move || results.next().unwrap_or_else(|| Ok(vec![])));

        let mut clock = MockClock::new();
        let mut instants = vec![10_000u64, 70_000u64].into_iter();
        clock
            .expect_now_millis()
            .times(2)
            .returning(move || instants.next().unwrap_or_default());

        let cache = cache_with(source, clock, Duration::from_secs(60));
        assert!(cache.list().await.is_ok());
        // The previous snapshot is not reused once the window advances
        assert!(cache.list().await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_release_fails_refresh() {
        let mut source = MockReleaseSource::new();
        source.expect_fetch_releases().times(1).returning(|| {
            let mut bad = make_release("v1.0.0");
            bad.published_at = Some("garbage".to_string());
            Ok(vec![make_release("v2.0.0"), bad])
        });

        let mut clock = MockClock::new();
        clock.expect_now_millis().returning(|| 1_000);

        let cache = cache_with(source, clock, Duration::from_secs(60));
        let err = cache.list().await.unwrap_err();

        assert!(matches!(err, VersionError::MalformedRelease { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_calls_coalesce() {
        let mut source = MockReleaseSource::new();
        source
            .expect_fetch_releases()
            .times(1)
            .returning(|| Ok(vec![make_release("v1.0.0")]));

        let mut clock = MockClock::new();
        clock.expect_now_millis().return_const(10_000u64);

        let cache = Arc::new(cache_with(source, clock, Duration::from_secs(60)));
        let a = Arc::clone(&cache);
        let b = Arc::clone(&cache);
        let (ra, rb) = tokio::join!(a.list(), b.list());

        assert_eq!(ra.unwrap(), rb.unwrap());
    }
}
