use thiserror::Error;

/// Errors surfaced by the version catalog.
#[derive(Debug, Error)]
pub enum VersionError {
    /// The release source was unreachable or returned an error.
    /// Propagated verbatim; the catalog never retries on its own.
    #[error("Failed to fetch releases from upstream: {0}")]
    Upstream(#[source] anyhow::Error),

    /// No version matched the requested tag after filtering.
    #[error("Version not found: {tag}")]
    NotFound { tag: String },

    /// A raw release could not be normalized. Strict policy: one bad
    /// record fails the whole refresh rather than silently narrowing
    /// the catalog.
    #[error("Malformed release data for tag '{tag}': {reason}")]
    MalformedRelease { tag: String, reason: String },
}
