//! Trusted origin set
//!
//! Origins allowed to deliver callback messages. Built from the configured
//! origin, the current page origin, and whatever the backend returns with
//! the auth payload. Entries are normalized to `scheme://host[:port]`.

use std::collections::BTreeSet;
use url::Url;

/// Normalize a URL or origin string to its ASCII origin serialization.
///
/// Returns `None` for unparsable input and opaque origins (`data:`, `file:`).
pub fn normalize_origin(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return None;
    }
    Some(origin.ascii_serialization())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustedOriginSet {
    origins: BTreeSet<String>,
}

impl TrustedOriginSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the set with the configured origin and the current page origin
    pub fn seeded(configured: Option<&str>, current_page: Option<&str>) -> Self {
        let mut set = Self::new();
        set.merge(configured.into_iter().chain(current_page));
        set
    }

    /// Insert one origin; returns `false` if it was invalid or already present
    pub fn insert(&mut self, raw: &str) -> bool {
        match normalize_origin(raw) {
            Some(origin) => self.origins.insert(origin),
            None => false,
        }
    }

    /// Union with another list of origins; invalid entries are skipped
    pub fn merge<I, S>(&mut self, origins: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        origins
            .into_iter()
            .filter(|o| self.insert(o.as_ref()))
            .count()
    }

    pub fn contains(&self, origin: &str) -> bool {
        normalize_origin(origin)
            .map(|o| self.origins.contains(&o))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.origins.iter().map(|s| s.as_str())
    }
}
