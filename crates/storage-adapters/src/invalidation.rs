//! In-process view invalidation.
//!
//! Server-rendered pages are cached by path elsewhere; this registry only
//! remembers which paths went stale and when, until a renderer drains them.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use domains::ports::ViewInvalidator;
use tracing::debug;

#[derive(Debug, Default)]
pub struct StaleViewRegistry {
    stale: DashMap<String, DateTime<Utc>>,
}

impl StaleViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stale(&self, path: &str) -> bool {
        self.stale.contains_key(path)
    }

    /// When `path` was last invalidated, if it is still pending.
    pub fn stale_since(&self, path: &str) -> Option<DateTime<Utc>> {
        self.stale.get(path).map(|entry| *entry.value())
    }

    /// Removes and returns every pending path, oldest first.
    pub fn drain(&self) -> Vec<String> {
        let mut pending: Vec<(String, DateTime<Utc>)> = self
            .stale
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        pending.sort_by_key(|(_, at)| *at);
        for (path, _) in &pending {
            self.stale.remove(path);
        }
        pending.into_iter().map(|(path, _)| path).collect()
    }
}

impl ViewInvalidator for StaleViewRegistry {
    fn invalidate(&self, path: &str) {
        debug!(path, "view invalidated");
        self.stale.insert(path.to_owned(), Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_clears_pending_paths() {
        let registry = StaleViewRegistry::new();
        registry.invalidate("/");
        registry.invalidate("/thought/abc");
        registry.invalidate("/");

        assert!(registry.is_stale("/"));
        assert!(registry.stale_since("/thought/abc").is_some());

        let mut drained = registry.drain();
        drained.sort();
        assert_eq!(drained, ["/", "/thought/abc"]);
        assert!(!registry.is_stale("/"));
        assert!(registry.drain().is_empty());
    }
}
