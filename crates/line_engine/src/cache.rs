//! Short-lived, process-local response cache keyed by (sport, bookmaker, day offset).
//! Latency only: anything here may vanish at any time without changing results
//! beyond freshness.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

type CacheKey = (String, String, u32);

pub struct ResponseCache<V> {
    ttl:     Duration,
    entries: Mutex<HashMap<CacheKey, (Instant, Arc<V>)>>,
}

impl<V> ResponseCache<V> {
    /// A zero `ttl` disables caching.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()) }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, (Instant, Arc<V>)>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, sport: &str, bookmaker: &str, day_offset: u32) -> Option<Arc<V>> {
        if self.ttl.is_zero() {
            return None;
        }
        let key = (sport.to_string(), bookmaker.to_string(), day_offset);
        let mut entries = self.lock();
        match entries.get(&key) {
            Some((stored_at, value)) if stored_at.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, sport: &str, bookmaker: &str, day_offset: u32, value: Arc<V>) {
        if self.ttl.is_zero() {
            return;
        }
        let now = Instant::now();
        let mut entries = self.lock();
        entries.retain(|_, (stored_at, _)| now.duration_since(*stored_at) < self.ttl);
        entries.insert((sport.to_string(), bookmaker.to_string(), day_offset), (now, value));
    }
}
