//! Opening capture & diff.
//!
//! Resolution order per line:
//!   1. read (canonical, then legacy + migration); an existing opening always wins
//!   2. nothing stored and no live value → unknown, write nothing
//!   3. nothing stored → SET NX our live value, then read again and return
//!      whatever the store holds, so racing callers all converge on the winner
//!
//! A failed read (store down, timeout) never leads to a write: it could be
//! hiding a record that already exists.

use chrono::Utc;
use futures_util::future::join_all;
use logger::{now_iso, EventLogger, OpeningCapturedEvent, StoreDegradedEvent};
use opening_store::{Lookup, OpeningRecord, OpeningStore, StoreKey};
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::line::{DiffResult, LineIdentity, LiveObservation, MarketKind};

/// Which fields a spread/total opening locks in. Moneyline always locks the price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpeningFields {
    #[default]
    PointOnly,
    PointAndPrice,
}

impl OpeningFields {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "point" | "point_only"                   => Some(OpeningFields::PointOnly),
            "point_price" | "point_and_price" | "both" => Some(OpeningFields::PointAndPrice),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedLine {
    pub opening: Option<OpeningRecord>,
    pub diff:    DiffResult,
}

pub struct OpeningEngine {
    store:  OpeningStore,
    fields: OpeningFields,
    audit:  Option<EventLogger>,
}

impl OpeningEngine {
    pub fn new(store: OpeningStore, fields: OpeningFields) -> Self {
        Self { store, fields, audit: None }
    }

    pub fn with_audit(mut self, logger: EventLogger) -> Self {
        self.audit = Some(logger);
        self
    }

    /// Opening for the observed line, seeded from the live quote on first sight.
    /// The seed value is the price for moneyline and the point for spread/total;
    /// with `PointAndPrice` a point market also locks the live price. The whole
    /// resolution (read, migration, create, re-read) shares one store deadline.
    pub async fn resolve_opening(&self, obs: &LiveObservation) -> Option<OpeningRecord> {
        let key = obs.identity.store_key();
        let seed = obs.primary().map(|v| self.seed(obs.identity.market, v, obs.price));

        match timeout(self.store.timeout(), self.resolve(&obs.identity, &key, seed)).await {
            Ok(opening) => opening,
            Err(_) => {
                self.degraded(&key, "resolve", "timeout");
                None
            }
        }
    }

    /// Resolves the opening for one observation and diffs the live quote against it.
    pub async fn observe(&self, obs: &LiveObservation) -> ResolvedLine {
        let opening = self.resolve_opening(obs).await;
        let diff = diff(obs, opening.as_ref(), self.fields);
        ResolvedLine { opening, diff }
    }

    pub async fn observe_all(&self, observations: &[LiveObservation]) -> Vec<ResolvedLine> {
        join_all(observations.iter().map(|obs| self.observe(obs))).await
    }

    fn seed(&self, market: MarketKind, primary: f64, live_price: Option<f64>) -> OpeningRecord {
        let captured_at = Utc::now().timestamp();
        match market {
            MarketKind::Moneyline => OpeningRecord { price: Some(primary), point: None, captured_at },
            MarketKind::Spread | MarketKind::Total => OpeningRecord {
                price: match self.fields {
                    OpeningFields::PointOnly     => None,
                    OpeningFields::PointAndPrice => live_price,
                },
                point: Some(primary),
                captured_at,
            },
        }
    }

    async fn resolve(
        &self,
        identity: &LineIdentity,
        key:      &StoreKey,
        seed:     Option<OpeningRecord>,
    ) -> Option<OpeningRecord> {
        match self.store.read(key).await {
            Lookup::Found(existing) => return Some(existing),
            Lookup::Missing => {}
            Lookup::Unknown(kind) => {
                self.degraded(key, "read", kind);
                return None;
            }
        }

        let seed = seed?;

        match self.store.create_if_absent(key, &seed, self.store.ttl()).await {
            Ok(true) => {
                info!(key = %key.canonical, price = ?seed.price, point = ?seed.point, "opening captured");
                self.captured(identity, key, &seed);
            }
            Ok(false) => debug!(key = %key.canonical, "opening already seeded by a concurrent caller"),
            Err(e) => self.degraded(key, "create_if_absent", e.kind()),
        }

        match self.store.read(key).await {
            Lookup::Found(stored) => Some(stored),
            Lookup::Missing => None,
            Lookup::Unknown(kind) => {
                self.degraded(key, "read", kind);
                None
            }
        }
    }

    fn captured(&self, identity: &LineIdentity, key: &StoreKey, record: &OpeningRecord) {
        if let Some(audit) = &self.audit {
            audit.log_or_warn(&OpeningCapturedEvent {
                ts:        now_iso(),
                event:     "OPENING_CAPTURED",
                key:       key.canonical.clone(),
                sport:     identity.sport.clone(),
                bookmaker: identity.bookmaker.clone(),
                event_id:  identity.event_id.clone(),
                market:    identity.market.as_str().to_string(),
                side:      identity.side.clone(),
                price:     record.price,
                point:     record.point,
            });
        }
    }

    fn degraded(&self, key: &StoreKey, op: &'static str, kind: &str) {
        debug!(key = %key.canonical, op, kind, "opening unknown, store degraded");
        if let Some(audit) = &self.audit {
            audit.log_or_warn(&StoreDegradedEvent {
                ts:    now_iso(),
                event: "STORE_DEGRADED",
                key:   key.canonical.clone(),
                op,
                kind:  kind.to_string(),
            });
        }
    }
}

/// Live minus opening, price with price and point with point only.
pub fn diff(obs: &LiveObservation, opening: Option<&OpeningRecord>, fields: OpeningFields) -> DiffResult {
    let Some(open) = opening else {
        return DiffResult::default();
    };
    match obs.identity.market {
        MarketKind::Moneyline => DiffResult {
            price_diff: delta(obs.price, open.price),
            point_diff: None,
        },
        MarketKind::Spread | MarketKind::Total => DiffResult {
            price_diff: match fields {
                OpeningFields::PointOnly     => None,
                OpeningFields::PointAndPrice => delta(obs.price, open.price),
            },
            point_diff: delta(obs.point, open.point),
        },
    }
}

fn delta(live: Option<f64>, open: Option<f64>) -> Option<f64> {
    let d = live? - open?;
    // 7.1 - 6.9 should read 0.2
    Some((d * 10_000.0).round() / 10_000.0)
}
