//! Filtering of the cached version list.
//!
//! A version survives only if all requested predicates hold, checked in
//! order: channel, platform availability, semver range. The input order
//! (descending version) is preserved.

use semver::VersionReq;
use serde::{Deserialize, Serialize};

use crate::platform::PlatformResolver;

use super::Version;

/// Filter predicates. Defaults match the latest stable version on any
/// platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Semver range, exact version, or the literal "latest"
    pub tag: String,
    /// Requested platform; resolved to a canonical tag before comparison
    pub platform: Option<String>,
    /// Release channel; "*" matches any channel
    pub channel: String,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            tag: "latest".to_string(),
            platform: None,
            channel: "stable".to_string(),
        }
    }
}

impl FilterOptions {
    /// Options selecting a single tag, with the remaining defaults.
    pub fn for_tag(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }
}

/// Requested tag, translated into matchable form.
enum TagRange {
    /// "latest" or "*": every version, prereleases included
    Any,
    /// A bare full version: exact match
    Exact(semver::Version),
    /// Anything else: a semver range such as "^1.2.0"
    Range(VersionReq),
}

impl TagRange {
    fn parse(tag: &str) -> Option<Self> {
        if tag == "latest" || tag == "*" {
            return Some(TagRange::Any);
        }
        if let Ok(version) = semver::Version::parse(tag) {
            return Some(TagRange::Exact(version));
        }
        VersionReq::parse(tag).ok().map(TagRange::Range)
    }

    fn matches(&self, tag: &str) -> bool {
        let Ok(version) = semver::Version::parse(tag) else {
            return false;
        };
        match self {
            TagRange::Any => true,
            TagRange::Exact(exact) => version == *exact,
            TagRange::Range(req) => req.matches(&version),
        }
    }
}

/// Apply the filter predicates to a sorted version list.
///
/// An unresolvable requested platform or an unparseable range matches
/// nothing.
pub fn filter_versions(
    resolver: &dyn PlatformResolver,
    versions: &[Version],
    opts: &FilterOptions,
) -> Vec<Version> {
    let Some(range) = TagRange::parse(&opts.tag) else {
        return Vec::new();
    };

    // Canonicalize the requested platform up front; a name the resolver
    // does not know filters out every version
    let platform = match &opts.platform {
        Some(name) => match resolver.detect(name) {
            Some(tag) => Some(tag),
            None => return Vec::new(),
        },
        None => None,
    };

    versions
        .iter()
        .filter(|version| {
            if opts.channel != "*" && version.channel != opts.channel {
                return false;
            }

            if let Some(requested) = &platform {
                let available: Vec<String> = version.platforms.keys().cloned().collect();
                if !resolver.satisfies(requested, &available) {
                    return false;
                }
            }

            range.matches(&version.tag)
        })
        .cloned()
        .collect()
}
