/// OpenLine — Odds Feed
///
/// Upstream odds provider (the-odds-api v4 shape):
///   GET {base}/sports/{sport}/odds?regions=us&markets=h2h,spreads,totals&bookmakers=...
///
/// Only fetches and decodes. Prices and points stay raw JSON values here,
/// the line engine normalizes them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.the-odds-api.com/v4";

pub const SUPPORTED_SPORTS: &[&str] = &[
    "baseball_mlb",
    "mma_mixed_martial_arts",
    "basketball_wnba",
    "americanfootball_nfl",
    "americanfootball_ncaaf",
];
pub const DEFAULT_SPORT: &str = "baseball_mlb";

pub const SUPPORTED_BOOKMAKERS: &[&str] = &["draftkings", "betonlineag", "fanduel", "caesars"];
pub const DEFAULT_BOOKMAKER: &str = "draftkings";

/// Upstream market keys: moneyline, spreads, totals.
pub const ALL_MARKETS: &[&str] = &["h2h", "spreads", "totals"];

// ── Payload structs ──────────────────────────────────────────────────────────

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Event {
    pub id:            String,
    #[serde(default)]
    pub sport_key:     Option<String>,
    #[serde(default)]
    pub home_team:     String,
    #[serde(default)]
    pub away_team:     String,
    /// ISO-8601 UTC kickoff, e.g. "2026-10-19T23:05:00Z"
    #[serde(default)]
    pub commence_time: String,
    #[serde(default)]
    pub bookmakers:    Vec<Bookmaker>,
}

impl Event {
    pub fn bookmaker(&self, key: &str) -> Option<&Bookmaker> {
        self.bookmakers.iter().find(|b| b.key == key)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Bookmaker {
    pub key:     String,
    #[serde(default)]
    pub title:   Option<String>,
    #[serde(default)]
    pub markets: Vec<Market>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Market {
    pub key:      String,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Outcome {
    #[serde(default)]
    pub name:  String,
    /// American odds: 110, "+110", -150 ...
    #[serde(default)]
    pub price: Option<serde_json::Value>,
    /// Spread / total line: -3.5, "8.5" ...
    #[serde(default)]
    pub point: Option<serde_json::Value>,
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("odds provider unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("odds provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("odds provider payload malformed: {0}")]
    Decode(#[from] serde_json::Error),
}

// ── Provider ─────────────────────────────────────────────────────────────────

#[async_trait]
pub trait OddsProvider: Send + Sync {
    async fn fetch_odds(
        &self,
        sport:     &str,
        bookmaker: &str,
        markets:   &[&str],
    ) -> Result<Vec<Event>, FeedError>;
}

pub struct OddsApiClient {
    client:   reqwest::Client,
    api_key:  String,
    base_url: String,
    regions:  String,
}

impl OddsApiClient {
    pub fn new(
        api_key:  impl Into<String>,
        base_url: impl Into<String>,
        regions:  impl Into<String>,
        timeout:  Duration,
    ) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            api_key:  api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            regions:  regions.into(),
        })
    }

    fn odds_url(&self, sport: &str) -> String {
        format!("{}/sports/{}/odds", self.base_url, sport)
    }
}

#[async_trait]
impl OddsProvider for OddsApiClient {
    async fn fetch_odds(
        &self,
        sport:     &str,
        bookmaker: &str,
        markets:   &[&str],
    ) -> Result<Vec<Event>, FeedError> {
        let markets = markets.join(",");
        let resp = self.client
            .get(self.odds_url(sport))
            .header("Accept", "application/json")
            .query(&[
                ("apiKey",     self.api_key.as_str()),
                ("regions",    self.regions.as_str()),
                ("markets",    markets.as_str()),
                ("bookmakers", bookmaker),
                ("oddsFormat", "american"),
                ("dateFormat", "iso"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if let Some(left) = resp.headers().get("x-requests-remaining").and_then(|v| v.to_str().ok()) {
            debug!("odds provider quota left: {left}");
        }

        let raw = resp.text().await?;
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
                body:   raw.chars().take(200).collect(),
            });
        }

        let events = decode_events(&raw)?;
        info!(sport = %sport, bookmaker = %bookmaker, "odds provider: {} events", events.len());
        Ok(events)
    }
}

pub fn decode_events(raw: &str) -> Result<Vec<Event>, FeedError> {
    Ok(serde_json::from_str(raw)?)
}
