//! Environment configuration (loaded after `dotenv().ok()`).

use anyhow::{Context, Result};
use chrono_tz::Tz;
use line_engine::{parse_day_offset, OpeningFields, REFERENCE_TZ};
use odds_feed::{DEFAULT_BASE_URL, DEFAULT_BOOKMAKER, DEFAULT_SPORT};
use std::path::PathBuf;
use std::time::Duration;

const DAY_SECS: u64 = 86_400;

/// Opening store endpoint + limits. All that `opening-inspect` needs.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub rest_url:    String,
    pub rest_token:  String,
    pub timeout:     Duration,   // per store call, 1–9s
    pub opening_ttl: Duration,   // retention window, 7–60 days
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub odds_api_key:      String,
    pub odds_api_base_url: String,
    pub odds_api_timeout:  Duration,
    pub odds_regions:      String,
    pub store:             StoreConfig,
    pub opening_fields:    OpeningFields,
    pub board_cache_ttl:   Duration,
    pub reference_tz:      Tz,
    pub log_dir:           PathBuf,
    pub sport:             String,
    pub bookmaker:         String,
    pub day_offset:        u32,
    pub poll_interval:     Option<Duration>,
}

fn required(get: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    get(name)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Missing {name} environment variable"))
}

fn number(get: &impl Fn(&str) -> Option<String>, name: &str, default: u64) -> u64 {
    get(name)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

impl StoreConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            rest_url:    required(&get, "KV_REST_URL")?,
            rest_token:  required(&get, "KV_REST_TOKEN")?,
            timeout:     Duration::from_secs(number(&get, "KV_TIMEOUT_SECS", 4).clamp(1, 9)),
            opening_ttl: Duration::from_secs(number(&get, "OPENING_TTL_DAYS", 14).clamp(7, 60) * DAY_SECS),
        })
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let opening_fields = match get("OPENING_FIELDS") {
            Some(raw) => OpeningFields::parse(&raw)
                .with_context(|| format!("OPENING_FIELDS must be `point` or `point_price`, got `{raw}`"))?,
            None => OpeningFields::default(),
        };

        let reference_tz = match get("REFERENCE_TZ") {
            Some(raw) => raw
                .trim()
                .parse::<Tz>()
                .ok()
                .with_context(|| format!("Unknown REFERENCE_TZ `{raw}`"))?,
            None => REFERENCE_TZ,
        };

        Ok(Self {
            odds_api_key:      required(&get, "ODDS_API_KEY")?,
            odds_api_base_url: get("ODDS_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            odds_api_timeout:  Duration::from_secs(number(&get, "ODDS_API_TIMEOUT_SECS", 25).max(1)),
            odds_regions:      get("ODDS_REGIONS").unwrap_or_else(|| "us".to_string()),
            store:             StoreConfig::from_lookup(&get)?,
            opening_fields,
            board_cache_ttl:   Duration::from_secs(number(&get, "BOARD_CACHE_SECS", 30)),
            reference_tz,
            log_dir:           PathBuf::from(get("LOG_DIR").unwrap_or_else(|| "logs".to_string())),
            sport:             get("SPORT").unwrap_or_else(|| DEFAULT_SPORT.to_string()),
            bookmaker:         get("BOOKMAKER").unwrap_or_else(|| DEFAULT_BOOKMAKER.to_string()),
            day_offset:        parse_day_offset(get("DAY_OFFSET").as_deref()),
            poll_interval:     get("BOARD_POLL_SECS")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("ODDS_API_KEY", "k"),
        ("KV_REST_URL", "https://kv.example"),
        ("KV_REST_TOKEN", "t"),
    ];

    #[test]
    fn defaults_follow_the_known_deployment() {
        let cfg = AppConfig::from_lookup(lookup(BASE)).unwrap();
        assert_eq!(cfg.odds_api_base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.sport, "baseball_mlb");
        assert_eq!(cfg.bookmaker, "draftkings");
        assert_eq!(cfg.day_offset, 0);
        assert_eq!(cfg.reference_tz, chrono_tz::America::New_York);
        assert_eq!(cfg.opening_fields, OpeningFields::PointOnly);
        assert_eq!(cfg.store.timeout, Duration::from_secs(4));
        assert_eq!(cfg.store.opening_ttl, Duration::from_secs(14 * DAY_SECS));
        assert_eq!(cfg.board_cache_ttl, Duration::from_secs(30));
        assert!(cfg.poll_interval.is_none());
    }

    #[test]
    fn limits_are_clamped() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("KV_TIMEOUT_SECS", "60"),
            ("OPENING_TTL_DAYS", "365"),
            ("DAY_OFFSET", "999"),
            ("OPENING_FIELDS", "point_price"),
            ("BOARD_POLL_SECS", "0"),
        ]);
        let cfg = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.store.timeout, Duration::from_secs(9));
        assert_eq!(cfg.store.opening_ttl, Duration::from_secs(60 * DAY_SECS));
        assert_eq!(cfg.day_offset, 30);
        assert_eq!(cfg.opening_fields, OpeningFields::PointAndPrice);
        assert!(cfg.poll_interval.is_none());
    }

    #[test]
    fn missing_secrets_and_bad_values_are_reported() {
        let err = AppConfig::from_lookup(lookup(&[("ODDS_API_KEY", "k")])).unwrap_err();
        assert!(err.to_string().contains("KV_REST_URL"));

        let mut pairs = BASE.to_vec();
        pairs.push(("REFERENCE_TZ", "Mars/Olympus"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = BASE.to_vec();
        pairs.push(("OPENING_FIELDS", "price"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());
    }
}
