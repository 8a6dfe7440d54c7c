// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Last-seen parent of each OSS entry
//!
//! The update path compares an entry's parent against the one recorded here
//! to decide whether the PUT must carry `move=true`. Keys include the base URL
//! so Staging and Production never collide.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

static GLOBAL: Lazy<Arc<ParentMap>> = Lazy::new(|| Arc::new(ParentMap::new()));

/// Synchronized `(base URL, entry id) -> parent id` map
#[derive(Debug, Default)]
pub struct ParentMap {
    parents: Mutex<HashMap<(String, String), String>>,
}

impl ParentMap {
    /// Empty map, independent of the process-wide one
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide map
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Remember `parent_id` as the current parent of `entry_id`
    pub fn record(&self, base_url: &str, entry_id: &str, parent_id: &str) {
        self.lock().insert((base_url.to_string(), entry_id.to_string()), parent_id.to_string());
    }

    /// Last-seen parent of `entry_id`, `None` if it was never read or written
    #[must_use]
    pub fn lookup(&self, base_url: &str, entry_id: &str) -> Option<String> {
        self.lock().get(&(base_url.to_string(), entry_id.to_string())).cloned()
    }

    /// Forget `entry_id`; returns the parent it had
    pub fn forget(&self, base_url: &str, entry_id: &str) -> Option<String> {
        self.lock().remove(&(base_url.to_string(), entry_id.to_string()))
    }

    /// Number of tracked entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(String, String), String>> {
        self.parents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_record_lookup_forget() {
        let map = ParentMap::new();
        assert_eq!(map.lookup("https://a", "oss_tribe.t1"), None);
        map.record("https://a", "oss_tribe.t1", "oss_segment.s1");
        assert_eq!(map.lookup("https://a", "oss_tribe.t1").as_deref(), Some("oss_segment.s1"));
        assert_eq!(map.lookup("https://b", "oss_tribe.t1"), None);
        assert_eq!(map.forget("https://a", "oss_tribe.t1").as_deref(), Some("oss_segment.s1"));
        assert!(map.is_empty());
    }

    #[test]
    fn test_top_level_entries_have_empty_parent() {
        let map = ParentMap::new();
        map.record("https://a", "oss.x", "");
        assert_eq!(map.lookup("https://a", "oss.x").as_deref(), Some(""));
    }

    #[test]
    fn test_global_is_shared() {
        ParentMap::global().record("https://parent-map-test", "oss.g", "");
        assert!(ParentMap::global().lookup("https://parent-map-test", "oss.g").is_some());
        ParentMap::global().forget("https://parent-map-test", "oss.g");
    }

    #[test]
    fn test_concurrent_records() {
        let map = Arc::new(ParentMap::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let map = Arc::clone(&map);
                thread::spawn(move || map.record("https://a", &format!("oss.{i}"), ""))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(map.len(), 8);
    }
}
