//! Application version lookup.
//!
//! The engine compares the persisted version against the current one to
//! detect updates. Versions are opaque strings, compared for equality only.

/// Supplies the current application version.
pub trait VersionProvider: Send + Sync {
    /// Returns the current version string.
    fn current_version(&self) -> String;
}

/// A fixed version string.
///
/// Callers typically pass `env!("CARGO_PKG_VERSION")`.
#[derive(Debug, Clone)]
pub struct StaticVersion(String);

impl StaticVersion {
    /// Wraps a fixed version string.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }
}

impl VersionProvider for StaticVersion {
    fn current_version(&self) -> String {
        self.0.clone()
    }
}
