//! OpenLine — Opening Store
//!
//! The only read/write path to persisted opening lines. Backed by an external
//! key-value store whose `SET NX EX` is atomic across processes; that single
//! primitive is what keeps concurrent first observers from seeding two
//! different openings.
//!
//! Reads never fail: transport errors, timeouts and garbage payloads come back
//! as `Lookup::Unknown(kind)` so odds can still be served without diffs.

pub mod error;
#[cfg(any(test, feature = "testkit"))]
pub mod memory;
pub mod rest;

pub use error::{Result, StoreError};
#[cfg(any(test, feature = "testkit"))]
pub use memory::MemoryKv;
pub use rest::RestKv;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

// ── Transport ────────────────────────────────────────────────────────────────

#[async_trait]
pub trait KvTransport: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Atomic create-if-absent with expiry. `true` iff this call created the key.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    async fn del(&self, keys: &[&str]) -> Result<u64>;
}

// ── Data ─────────────────────────────────────────────────────────────────────

/// First observed value of one market line. Never mutated once stored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OpeningRecord {
    #[serde(default)]
    pub price:       Option<f64>,
    #[serde(default)]
    pub point:       Option<f64>,
    pub captured_at: i64,   // epoch seconds
}

/// Canonical (encoded) key plus the key older deployments wrote for the same line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    pub canonical: String,
    pub legacy:    String,
}

impl StoreKey {
    pub fn new(canonical: impl Into<String>, legacy: impl Into<String>) -> Self {
        Self { canonical: canonical.into(), legacy: legacy.into() }
    }

    fn has_distinct_legacy(&self) -> bool {
        self.canonical != self.legacy
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(OpeningRecord),
    Missing,
    /// Store failed; carries `StoreError::kind()`.
    Unknown(&'static str),
}

impl Lookup {
    pub fn record(self) -> Option<OpeningRecord> {
        match self {
            Lookup::Found(r) => Some(r),
            Lookup::Missing | Lookup::Unknown(_) => None,
        }
    }
}

// ── Store client ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct OpeningStore {
    kv:      Arc<dyn KvTransport>,
    ttl:     Duration,
    timeout: Duration,
}

impl OpeningStore {
    pub fn new(kv: Arc<dyn KvTransport>, ttl: Duration, timeout: Duration) -> Self {
        Self { kv, ttl, timeout }
    }

    /// Retention window applied to every record this client writes.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Budget shared by every store call one `read` or `create_if_absent` makes.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.timeout
    }

    async fn bounded<T>(&self, deadline: Instant, call: impl Future<Output = Result<T>>) -> Result<T> {
        timeout_at(deadline, call)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }

    async fn get_record(&self, deadline: Instant, key: &str) -> Result<Option<OpeningRecord>> {
        match self.bounded(deadline, self.kv.get(key)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Canonical key first, then the legacy key (migrating it on a hit).
    pub async fn read(&self, key: &StoreKey) -> Lookup {
        let deadline = self.deadline();
        match self.get_record(deadline, &key.canonical).await {
            Ok(Some(record)) => return Lookup::Found(record),
            Ok(None) => {}
            Err(e) => {
                warn!(key = %key.canonical, "opening read failed: {e}");
                return Lookup::Unknown(e.kind());
            }
        }

        if !key.has_distinct_legacy() {
            return Lookup::Missing;
        }

        match self.get_record(deadline, &key.legacy).await {
            Ok(Some(record)) => self.migrate(deadline, key, record).await,
            Ok(None) => Lookup::Missing,
            Err(e) => {
                warn!(key = %key.legacy, "legacy opening read failed: {e}");
                Lookup::Unknown(e.kind())
            }
        }
    }

    /// Moves a legacy record under the canonical key. Best effort: on any write
    /// failure the legacy entry stays put and the next read retries.
    async fn migrate(&self, deadline: Instant, key: &StoreKey, record: OpeningRecord) -> Lookup {
        let payload = match serde_json::to_string(&record) {
            Ok(p) => p,
            Err(e) => {
                warn!(key = %key.legacy, "legacy opening not re-encodable: {e}");
                return Lookup::Found(record);
            }
        };

        match self.bounded(deadline, self.kv.set_nx_ex(&key.canonical, &payload, self.ttl)).await {
            Ok(true) => info!(from = %key.legacy, to = %key.canonical, "migrated legacy opening key"),
            Ok(false) => debug!(key = %key.canonical, "canonical opening already present, dropping legacy"),
            Err(e) => {
                warn!(key = %key.canonical, "legacy migration write failed: {e}");
                return Lookup::Found(record);
            }
        }

        if let Err(e) = self.bounded(deadline, self.kv.del(&[key.legacy.as_str()])).await {
            warn!(key = %key.legacy, "legacy opening delete failed: {e}");
        }

        // canonical is authoritative from here on
        match self.get_record(deadline, &key.canonical).await {
            Ok(Some(stored)) => Lookup::Found(stored),
            _ => Lookup::Found(record),
        }
    }

    /// Atomically stores `record` under the canonical key unless one exists.
    /// `Ok(true)` only for the caller that actually created it.
    pub async fn create_if_absent(
        &self,
        key:    &StoreKey,
        record: &OpeningRecord,
        ttl:    Duration,
    ) -> Result<bool> {
        let payload = serde_json::to_string(record)?;
        self.bounded(self.deadline(), self.kv.set_nx_ex(&key.canonical, &payload, ttl)).await
    }
}
