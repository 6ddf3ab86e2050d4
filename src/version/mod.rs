//! Canonical version model and normalization of raw releases.
//!
//! Raw GitHub releases become immutable [`Version`] records: the tag loses
//! its `v` prefix, the release channel is derived from the tag suffix, and
//! assets are keyed by canonical platform tag. Draft releases never become
//! versions.

mod cache;
mod catalog;
mod error;
mod filter;

pub use cache::{Clock, SystemClock, VersionCache};
pub use catalog::VersionCatalog;
pub use error::VersionError;
pub use filter::{FilterOptions, filter_versions};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::github::RawRelease;
use crate::platform::PlatformResolver;

/// A downloadable build of a version for one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformAsset {
    pub filename: String,
    pub download_url: String,
    pub download_count: u64,
}

/// A normalized release. Immutable once constructed; rebuilt wholesale on
/// every cache refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// Semver tag with the leading `v` stripped (e.g. "2.0.0-beta.3")
    pub tag: String,
    /// Release channel derived from the tag suffix ("stable" when none)
    pub channel: String,
    /// Release notes; empty when the release has no body
    pub notes: String,
    pub published_at: DateTime<Utc>,
    /// Assets keyed by canonical platform tag; unresolvable assets are dropped
    pub platforms: HashMap<String, PlatformAsset>,
    /// Sum of download counts over assets that resolved to a platform
    pub download_count: u64,
}

/// Strip a single leading `v` from a tag name.
pub fn normalize_tag(tag: &str) -> &str {
    tag.strip_prefix('v').unwrap_or(tag)
}

/// Extract the release channel from a tag name.
///
/// The channel is the segment after the first `-`, truncated at the first
/// `.` (`2.0.0-beta.3` -> `beta`). Tags without a suffix are `stable`.
pub fn extract_channel(tag: &str) -> &str {
    match tag.split_once('-') {
        Some((_, suffix)) => suffix.split('.').next().unwrap_or(suffix),
        None => "stable",
    }
}

/// Normalize a raw release into a [`Version`].
///
/// Returns `Ok(None)` for draft releases. Assets whose name does not resolve
/// to a known platform are dropped silently and do not contribute to the
/// download count; two assets resolving to the same platform keep the later
/// one. Unparseable publish timestamps or tags fail loudly.
pub fn normalize(
    resolver: &dyn PlatformResolver,
    release: RawRelease,
) -> Result<Option<Version>, VersionError> {
    if release.draft {
        return Ok(None);
    }

    let tag = normalize_tag(&release.tag_name).to_string();

    // Data-integrity check: the cache sorts by parsed semver, so a tag that
    // does not parse would poison the whole snapshot
    if let Err(e) = semver::Version::parse(&tag) {
        return Err(VersionError::MalformedRelease {
            tag: release.tag_name,
            reason: format!("invalid semver tag: {}", e),
        });
    }

    let published_at = release
        .published_at
        .as_deref()
        .ok_or_else(|| VersionError::MalformedRelease {
            tag: release.tag_name.clone(),
            reason: "missing publish timestamp".to_string(),
        })?;
    let published_at = DateTime::parse_from_rfc3339(published_at)
        .map_err(|e| VersionError::MalformedRelease {
            tag: release.tag_name.clone(),
            reason: format!("invalid publish timestamp: {}", e),
        })?
        .with_timezone(&Utc);

    let mut platforms = HashMap::new();
    let mut download_count = 0;
    for asset in release.assets {
        let Some(platform) = resolver.detect(&asset.name) else {
            continue;
        };
        download_count += asset.download_count;
        // Last asset wins when two resolve to the same platform
        platforms.insert(
            platform,
            PlatformAsset {
                filename: asset.name,
                download_url: asset.url,
                download_count: asset.download_count,
            },
        );
    }

    Ok(Some(Version {
        tag,
        channel: extract_channel(&release.tag_name).to_string(),
        notes: release.body.unwrap_or_default(),
        published_at,
        platforms,
        download_count,
    }))
}

/// Compare two versions for descending semver order (highest first).
pub fn compare(a: &Version, b: &Version) -> Ordering {
    match (
        semver::Version::parse(&a.tag),
        semver::Version::parse(&b.tag),
    ) {
        (Ok(va), Ok(vb)) => vb.cmp(&va),
        // Unreachable for normalized versions; keeps hand-built ones total
        _ => b.tag.cmp(&a.tag),
    }
}
