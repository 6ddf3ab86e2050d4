//! The version catalog: the public query surface over one release source.
//!
//! A catalog owns its cache, so independent catalogs (one per upstream
//! repository) can live in the same process without sharing state.

use std::sync::Arc;
use std::time::Duration;

use crate::github::ReleaseSource;
use crate::platform::PlatformResolver;

use super::cache::{Clock, VersionCache};
use super::filter::{FilterOptions, filter_versions};
use super::{Version, VersionError};

pub struct VersionCatalog {
    cache: VersionCache,
    platforms: Arc<dyn PlatformResolver>,
}

impl VersionCatalog {
    pub fn new(
        source: Arc<dyn ReleaseSource>,
        platforms: Arc<dyn PlatformResolver>,
        ttl: Duration,
    ) -> Self {
        Self {
            cache: VersionCache::new(source, Arc::clone(&platforms), ttl),
            platforms,
        }
    }

    pub fn with_clock(
        source: Arc<dyn ReleaseSource>,
        platforms: Arc<dyn PlatformResolver>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache: VersionCache::with_clock(source, Arc::clone(&platforms), ttl, clock),
            platforms,
        }
    }

    /// All known versions, sorted descending (highest first).
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Arc<Vec<Version>>, VersionError> {
        self.cache.list().await
    }

    /// Versions matching the given predicates, in descending order.
    #[tracing::instrument(skip(self))]
    pub async fn filter(&self, opts: &FilterOptions) -> Result<Vec<Version>, VersionError> {
        let versions = self.cache.list().await?;
        Ok(filter_versions(self.platforms.as_ref(), &versions, opts))
    }

    /// The single best match: the highest version passing the filter.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, opts: &FilterOptions) -> Result<Version, VersionError> {
        self.filter(opts)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| VersionError::NotFound {
                tag: opts.tag.clone(),
            })
    }

    /// Look up a specific tag through the same pipeline as [`resolve`].
    ///
    /// Channel defaults still apply: fetching a non-stable tag requires
    /// resolving with channel "*" or the matching channel instead.
    ///
    /// [`resolve`]: VersionCatalog::resolve
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, tag: &str) -> Result<Version, VersionError> {
        self.resolve(&FilterOptions::for_tag(tag)).await
    }
}
