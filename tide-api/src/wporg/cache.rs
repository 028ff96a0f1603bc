//! Optional page cache collaborator
//!
//! Modeled as an injected capability: the interception core holds an
//! `Option<Arc<dyn PageCache>>` and skips invalidation entirely when none
//! is configured.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Keyed cache of rendered REST responses
pub trait PageCache: Send + Sync {
    /// Drop the cache entry for a REST URL, if present
    fn clear_url(&self, url: &str);
}

/// In-process page cache
#[derive(Default)]
pub struct MemoryPageCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryPageCache {
    pub fn new() -> Self {
        Self::default()
    }

    // The cache is best-effort: a panic while holding the lock must not
    // take every later request down with it.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store a rendered response body under a REST URL
    pub fn store(&self, url: &str, body: String) {
        self.entries().insert(url.to_string(), body);
    }

    /// Fetch a cached body, if any
    pub fn get(&self, url: &str) -> Option<String> {
        self.entries().get(url).cloned()
    }
}

impl PageCache for MemoryPageCache {
    fn clear_url(&self, url: &str) {
        let removed = self.entries().remove(url).is_some();
        if removed {
            tracing::debug!(url = %url, "Cleared page cache entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_removes_only_the_named_url() {
        let cache = MemoryPageCache::new();
        cache.store("tide/v1/audit/wporg/plugin/akismet/4.1", "a".to_string());
        cache.store("tide/v1/audit/wporg/plugin/akismet/4.2", "b".to_string());

        cache.clear_url("tide/v1/audit/wporg/plugin/akismet/4.1");

        assert!(cache.get("tide/v1/audit/wporg/plugin/akismet/4.1").is_none());
        assert_eq!(
            cache.get("tide/v1/audit/wporg/plugin/akismet/4.2").as_deref(),
            Some("b")
        );
    }

    #[test]
    fn clearing_a_missing_url_is_a_no_op() {
        let cache = MemoryPageCache::new();
        cache.clear_url("tide/v1/audit/wporg/plugin/akismet/4.1");
        assert!(cache.get("tide/v1/audit/wporg/plugin/akismet/4.1").is_none());
    }

    #[test]
    fn survives_a_poisoned_lock() {
        let cache = std::sync::Arc::new(MemoryPageCache::new());
        cache.store("tide/v1/audit/wporg/plugin/akismet/4.1", "cached".to_string());

        // Poison the mutex by panicking while holding it
        let poisoner = cache.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.lock().unwrap();
            panic!("poison");
        })
        .join();

        cache.clear_url("tide/v1/audit/wporg/plugin/akismet/4.1");
        assert!(cache.get("tide/v1/audit/wporg/plugin/akismet/4.1").is_none());
    }
}
