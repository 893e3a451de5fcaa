/// OpenLine — Logger
/// JSONL audit event stream (one file per UTC day)

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }

    /// Audit writes must never fail the caller.
    pub fn log_or_warn<T: Serialize>(&self, event: &T) {
        if let Err(e) = self.log(event) {
            tracing::warn!("Audit log write failed: {e}");
        }
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event typy ────────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct OpeningCapturedEvent {
    pub ts:        String,
    pub event:     &'static str,   // "OPENING_CAPTURED"
    pub key:       String,
    pub sport:     String,
    pub bookmaker: String,
    pub event_id:  String,
    pub market:    String,         // "moneyline" | "spread" | "total"
    pub side:      String,
    pub price:     Option<f64>,
    pub point:     Option<f64>,
}

#[derive(Serialize, Debug)]
pub struct StoreDegradedEvent {
    pub ts:    String,
    pub event: &'static str,       // "STORE_DEGRADED"
    pub key:   String,
    pub op:    &'static str,       // "read" | "create_if_absent"
    pub kind:  String,             // StoreError::kind()
}

#[derive(Serialize, Debug)]
pub struct BoardServedEvent {
    pub ts:         String,
    pub event:      &'static str,  // "BOARD_SERVED"
    pub sport:      String,
    pub bookmaker:  String,
    pub day_offset: u32,
    pub games:      usize,
    pub upstream:   usize,         // events returned by the provider before filtering
}
