//! Platform detection and compatibility for release assets.
//!
//! Canonical platform tags are `{os}-{arch}` strings such as `linux-64`,
//! `osx-arm64`, or `windows-32`, detected from asset filenames.

/// Trait for resolving platform names (useful for testing)
#[cfg_attr(test, mockall::automock)]
pub trait PlatformResolver: Send + Sync {
    /// Map a raw asset or platform name to a canonical platform tag.
    ///
    /// Returns `None` if no platform can be recognized in the name.
    fn detect(&self, name: &str) -> Option<String>;

    /// Whether a requested platform can be served from the available set.
    fn satisfies(&self, requested: &str, available: &[String]) -> bool;
}

/// Default resolver using filename keyword matching
#[derive(Debug, Clone, Default)]
pub struct DefaultPlatformResolver;

impl DefaultPlatformResolver {
    fn detect_os(name: &str) -> Option<&'static str> {
        // "darwin" contains "win", so the macOS check must come first
        if name.contains("darwin")
            || name.contains("macos")
            || name.contains("osx")
            || name.contains("mac")
            || name.ends_with(".dmg")
        {
            return Some("osx");
        }
        if name.contains("win") || name.ends_with(".exe") || name.ends_with(".msi") {
            return Some("windows");
        }
        if name.contains("linux")
            || name.ends_with(".deb")
            || name.ends_with(".rpm")
            || name.ends_with(".appimage")
        {
            return Some("linux");
        }
        None
    }

    fn detect_arch(name: &str) -> &'static str {
        if name.contains("arm64") || name.contains("aarch64") {
            return "arm64";
        }
        if name.contains("i686") || name.contains("i386") || name.contains("ia32") {
            return "32";
        }
        if name.contains("x86_64")
            || name.contains("amd64")
            || name.contains("x64")
            || name.contains("64")
        {
            return "64";
        }
        if name.contains("32") || name.contains("x86") {
            return "32";
        }
        // Unmarked assets are assumed 64-bit
        "64"
    }
}

impl PlatformResolver for DefaultPlatformResolver {
    fn detect(&self, name: &str) -> Option<String> {
        let name = name.to_lowercase();
        let os = Self::detect_os(&name)?;
        let arch = Self::detect_arch(&name);
        Some(format!("{}-{}", os, arch))
    }

    fn satisfies(&self, requested: &str, available: &[String]) -> bool {
        if available.iter().any(|p| p == requested) {
            return true;
        }

        // A 64-bit host can run the 32-bit build of the same OS
        if let Some(os) = requested.strip_suffix("-64") {
            let fallback = format!("{}-32", os);
            return available.iter().any(|p| *p == fallback);
        }

        false
    }
}
