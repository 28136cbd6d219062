//! Named cache regions invalidated by write operations.
//!
//! Read paths store derived values (attendance summaries, record listings)
//! under a `(Region, key)` pair; every write that can change a region's data
//! invalidates the affected keys explicitly. This replaces ad hoc
//! string-array cache tagging with a closed set of regions.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// The closed set of cacheable regions.
///
/// Keys within a region are owned by the region: both attendance regions key
/// by session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// Per-session present/total summary counts.
    SessionSummary,
    /// Per-session record listing (joined with student names).
    SessionRecords,
}

/// Thread-safe region cache shared through `AppState`.
#[derive(Clone, Default)]
pub struct RegionCache {
    entries: Arc<DashMap<(Region, String), Value>>,
}

impl RegionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, region: Region, key: &str) -> Option<Value> {
        self.entries
            .get(&(region, key.to_string()))
            .map(|v| v.clone())
    }

    pub fn put(&self, region: Region, key: impl Into<String>, value: Value) {
        self.entries.insert((region, key.into()), value);
    }

    /// Drops a single key from a region.
    pub fn invalidate(&self, region: Region, key: &str) {
        self.entries.remove(&(region, key.to_string()));
    }

    /// Drops every key in a region.
    pub fn invalidate_region(&self, region: Region) {
        self.entries.retain(|(r, _), _| *r != region);
    }

    /// Drops every attendance region keyed by this session. Writes that touch
    /// a session's records call this so the next read recomputes.
    pub fn invalidate_session(&self, session_id: &str) {
        self.invalidate(Region::SessionSummary, session_id);
        self.invalidate(Region::SessionRecords, session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_get_roundtrip() {
        let cache = RegionCache::new();
        cache.put(Region::SessionSummary, "s1", json!({"present": 1, "total": 3}));
        assert_eq!(
            cache.get(Region::SessionSummary, "s1"),
            Some(json!({"present": 1, "total": 3}))
        );
        assert_eq!(cache.get(Region::SessionRecords, "s1"), None);
    }

    #[test]
    fn invalidate_session_clears_both_regions() {
        let cache = RegionCache::new();
        cache.put(Region::SessionSummary, "s1", json!(1));
        cache.put(Region::SessionRecords, "s1", json!([1, 2]));
        cache.put(Region::SessionSummary, "s2", json!(2));

        cache.invalidate_session("s1");

        assert_eq!(cache.get(Region::SessionSummary, "s1"), None);
        assert_eq!(cache.get(Region::SessionRecords, "s1"), None);
        assert_eq!(cache.get(Region::SessionSummary, "s2"), Some(json!(2)));
    }

    #[test]
    fn invalidate_region_keeps_other_regions() {
        let cache = RegionCache::new();
        cache.put(Region::SessionSummary, "s1", json!(1));
        cache.put(Region::SessionRecords, "s1", json!(2));

        cache.invalidate_region(Region::SessionSummary);

        assert_eq!(cache.get(Region::SessionSummary, "s1"), None);
        assert_eq!(cache.get(Region::SessionRecords, "s1"), Some(json!(2)));
    }
}
