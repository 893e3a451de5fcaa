//! Line identity, live observations and the storage key for an opening line.

use opening_store::StoreKey;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const KEY_PREFIX: &str = "opening:";
const KEY_DELIMITER: &str = ":";

pub const OVER: &str = "Over";
pub const UNDER: &str = "Under";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketKind {
    Moneyline,
    Spread,
    Total,
}

impl MarketKind {
    pub const ALL: [MarketKind; 3] = [MarketKind::Moneyline, MarketKind::Spread, MarketKind::Total];

    pub fn as_str(self) -> &'static str {
        match self {
            MarketKind::Moneyline => "moneyline",
            MarketKind::Spread    => "spread",
            MarketKind::Total     => "total",
        }
    }

    /// Market key used by the odds provider.
    pub fn upstream_key(self) -> &'static str {
        match self {
            MarketKind::Moneyline => "h2h",
            MarketKind::Spread    => "spreads",
            MarketKind::Total     => "totals",
        }
    }

    /// Accepts either our name or the provider's market key, any case.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        MarketKind::ALL
            .into_iter()
            .find(|m| m.as_str() == raw || m.upstream_key() == raw)
    }

    /// Moneyline openings lock the price, spreads and totals lock the point.
    pub fn primary_is_price(self) -> bool {
        matches!(self, MarketKind::Moneyline)
    }
}

impl fmt::Display for MarketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One opening-line record per identity. `side` is the team name as the
/// provider spells it (moneyline/spread) or `Over`/`Under` (totals).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineIdentity {
    pub sport:     String,
    pub bookmaker: String,
    pub event_id:  String,
    pub market:    MarketKind,
    pub side:      String,
}

impl LineIdentity {
    pub fn new(
        sport:     impl Into<String>,
        bookmaker: impl Into<String>,
        event_id:  impl Into<String>,
        market:    MarketKind,
        side:      impl Into<String>,
    ) -> Self {
        Self {
            sport:     sport.into(),
            bookmaker: bookmaker.into(),
            event_id:  event_id.into(),
            market,
            side:      side.into(),
        }
    }

    fn fields(&self) -> [&str; 5] {
        [
            self.sport.as_str(),
            self.bookmaker.as_str(),
            self.event_id.as_str(),
            self.market.as_str(),
            self.side.as_str(),
        ]
    }

    /// Canonical key: every field percent-encoded, so the delimiter can't
    /// appear inside a field.
    pub fn key(&self) -> String {
        let encoded: Vec<String> = self
            .fields()
            .iter()
            .map(|f| urlencoding::encode(f).into_owned())
            .collect();
        format!("{KEY_PREFIX}{}", encoded.join(KEY_DELIMITER))
    }

    /// Key written by deployments that skipped the encoding step.
    pub fn legacy_key(&self) -> String {
        format!("{KEY_PREFIX}{}", self.fields().join(KEY_DELIMITER))
    }

    pub fn store_key(&self) -> StoreKey {
        StoreKey::new(self.key(), self.legacy_key())
    }
}

/// A quote seen at request time. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveObservation {
    pub identity: LineIdentity,
    pub price:    Option<f64>,
    pub point:    Option<f64>,
}

impl LiveObservation {
    /// The value an opening is seeded from: price for moneyline, point otherwise.
    pub fn primary(&self) -> Option<f64> {
        if self.identity.market.primary_is_price() {
            self.price
        } else {
            self.point
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DiffResult {
    pub price_diff: Option<f64>,
    pub point_diff: Option<f64>,
}
