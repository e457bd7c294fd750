//! Single-slot time-to-live cache.
//!
//! Holds one value together with the instant it was stored. A read after the
//! time-to-live has elapsed misses, as does a read after [`TtlCache::invalidate`].
//! The `*_at` variants take the current instant explicitly so expiry can be
//! tested without sleeping.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    entry: Option<(Instant, T)>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    pub fn get(&self) -> Option<T> {
        self.get_at(Instant::now())
    }

    pub fn get_at(&self, now: Instant) -> Option<T> {
        self.entry
            .as_ref()
            .filter(|(stored, _)| now.saturating_duration_since(*stored) < self.ttl)
            .map(|(_, value)| value.clone())
    }

    pub fn insert(&mut self, value: T) {
        self.insert_at(value, Instant::now());
    }

    pub fn insert_at(&mut self, value: T, now: Instant) {
        self.entry = Some((now, value));
    }

    /// Drop the stored value; the next read misses.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_fresh(&self) -> bool {
        self.get_at(Instant::now()).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache_misses() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60));
        assert_eq!(cache.get(), None);
        assert!(!cache.is_fresh());
    }

    #[test]
    fn test_hit_within_ttl_and_miss_after() {
        let start = Instant::now();
        let mut cache = TtlCache::new(Duration::from_secs(60));
        cache.insert_at(vec![1, 2, 3], start);

        assert_eq!(cache.get_at(start), Some(vec![1, 2, 3]));
        assert_eq!(cache.get_at(start + Duration::from_secs(59)), Some(vec![1, 2, 3]));
        assert_eq!(cache.get_at(start + Duration::from_secs(60)), None);
    }

    #[test]
    fn test_insert_replaces_and_restarts_clock() {
        let start = Instant::now();
        let mut cache = TtlCache::new(Duration::from_secs(10));
        cache.insert_at("old", start);
        cache.insert_at("new", start + Duration::from_secs(8));
        assert_eq!(cache.get_at(start + Duration::from_secs(15)), Some("new"));
    }

    #[test]
    fn test_invalidate_forces_a_miss() {
        let mut cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("value".to_string());
        assert!(cache.is_fresh());
        cache.invalidate();
        assert_eq!(cache.get(), None);
    }

    #[test]
    fn test_zero_ttl_never_hits() {
        let now = Instant::now();
        let mut cache = TtlCache::new(Duration::ZERO);
        cache.insert_at(1u8, now);
        assert_eq!(cache.get_at(now), None);
    }
}
