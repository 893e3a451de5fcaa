//! In-process transport with the same atomic SET NX semantics as the real store.
//! Test-only: opening state must live in the shared store, never in process memory.

use crate::error::{Result, StoreError};
use crate::KvTransport;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Default)]
pub struct MemoryKv {
    entries:   Mutex<HashMap<String, (String, Instant)>>,
    offline:   AtomicBool,
    created:   AtomicUsize,
    deletes:   AtomicUsize,
    latency:   AtomicU64,   // millis per call
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with `StoreError::Unavailable` while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Simulated round trip applied before every call.
    pub fn set_latency(&self, latency: Duration) {
        self.latency.store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn insert_raw(&self, key: &str, value: &str, ttl: Duration) {
        self.lock().insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        let mut entries = self.lock();
        live_value(&mut entries, key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.raw(key).is_some()
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock().values().filter(|(_, exp)| *exp > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Successful SET NX calls so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Keys removed by DEL so far.
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, (String, Instant)>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Lets concurrent callers interleave like they would over the network.
    async fn round_trip(&self) {
        match self.latency.load(Ordering::SeqCst) {
            0 => tokio::task::yield_now().await,
            ms => tokio::time::sleep(Duration::from_millis(ms)).await,
        }
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory kv offline".to_string()));
        }
        Ok(())
    }
}

fn live_value(entries: &mut HashMap<String, (String, Instant)>, key: &str) -> Option<String> {
    match entries.get(key) {
        Some((value, exp)) if *exp > Instant::now() => Some(value.clone()),
        Some(_) => {
            entries.remove(key);
            None
        }
        None => None,
    }
}

#[async_trait]
impl KvTransport for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.round_trip().await;
        self.check_online()?;
        let mut entries = self.lock();
        Ok(live_value(&mut entries, key))
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        self.round_trip().await;
        self.check_online()?;
        let mut entries = self.lock();
        if live_value(&mut entries, key).is_some() {
            return Ok(false);
        }
        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn del(&self, keys: &[&str]) -> Result<u64> {
        self.round_trip().await;
        self.check_online()?;
        let mut entries = self.lock();
        let mut removed = 0;
        for key in keys {
            if entries.remove(*key).is_some() {
                removed += 1;
            }
        }
        self.deletes.fetch_add(removed as usize, Ordering::SeqCst);
        Ok(removed)
    }
}
