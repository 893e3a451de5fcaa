//! Builds the store → engine → board chain from configuration.

use anyhow::{Context, Result};
use line_engine::{BoardService, OpeningEngine};
use logger::EventLogger;
use odds_feed::OddsApiClient;
use opening_store::{OpeningStore, RestKv};
use std::sync::Arc;
use tracing::info;

use crate::config::{AppConfig, StoreConfig};

pub fn build_store(cfg: &StoreConfig) -> Result<OpeningStore> {
    let kv = RestKv::new(&cfg.rest_url, &cfg.rest_token, cfg.timeout)
        .context("Failed to build opening store client")?;
    Ok(OpeningStore::new(Arc::new(kv), cfg.opening_ttl, cfg.timeout))
}

pub fn build_board_service(cfg: &AppConfig) -> Result<BoardService> {
    let audit = EventLogger::new(&cfg.log_dir);

    let engine = OpeningEngine::new(build_store(&cfg.store)?, cfg.opening_fields)
        .with_audit(audit.clone());

    let provider = OddsApiClient::new(
        cfg.odds_api_key.clone(),
        cfg.odds_api_base_url.clone(),
        cfg.odds_regions.clone(),
        cfg.odds_api_timeout,
    )
    .context("Failed to build odds provider client")?;

    info!(
        ttl_days = cfg.store.opening_ttl.as_secs() / 86_400,
        fields = ?cfg.opening_fields,
        tz = cfg.reference_tz.name(),
        "opening pipeline ready"
    );

    Ok(BoardService::new(Arc::new(provider), Arc::new(engine), cfg.reference_tz, cfg.board_cache_ttl)
        .with_audit(audit))
}
