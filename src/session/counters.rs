//! Process-wide hit counters shared by every request and live stream.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

/// Global and per-URL visit counts.
///
/// Cloning is cheap; clones share the same counters.
#[derive(Clone, Default)]
pub struct HitCounters {
    global: Arc<AtomicI64>,
    per_url: Arc<DashMap<String, AtomicI64>>,
}

impl HitCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one visit to `url`, returning `(global, url)` totals after the increment.
    pub fn hit(&self, url: &str) -> (i64, i64) {
        let global = self.global.fetch_add(1, Ordering::Relaxed) + 1;

        // Fast path avoids taking the shard write lock for known URLs.
        if let Some(counter) = self.per_url.get(url) {
            return (global, counter.fetch_add(1, Ordering::Relaxed) + 1);
        }
        let counter = self
            .per_url
            .entry(url.to_string())
            .or_insert_with(|| AtomicI64::new(0));
        (global, counter.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn global(&self) -> i64 {
        self.global.load(Ordering::Relaxed)
    }

    pub fn url_hits(&self, url: &str) -> i64 {
        self.per_url
            .get(url)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_counts() {
        let counters = HitCounters::new();
        assert_eq!(counters.hit("/a/"), (1, 1));
        assert_eq!(counters.hit("/b/"), (2, 1));
        assert_eq!(counters.hit("/a/"), (3, 2));
        assert_eq!(counters.global(), 3);
        assert_eq!(counters.url_hits("/a/"), 2);
        assert_eq!(counters.url_hits("/none/"), 0);
    }

    #[tokio::test]
    async fn test_concurrent_first_hits_are_not_lost() {
        let counters = HitCounters::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let counters = counters.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    counters.hit("/race/");
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(counters.url_hits("/race/"), 800);
        assert_eq!(counters.global(), 800);
    }
}
