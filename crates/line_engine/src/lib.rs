//! OpenLine — Line Engine
//!
//! Opening-line capture and live/opening diffs for one bookmaker's board:
//!
//!   provider events → day window → market rows → opening resolve + diff → board
//!
//! Openings live only in the external store (`opening_store`); this crate holds
//! no opening state of its own.

pub mod board;
pub mod cache;
pub mod capture;
pub mod line;
pub mod markets;
pub mod normalize;
pub mod window;

pub use board::{Board, BoardError, BoardService, GameLines, MoneylineLine, PointLine};
pub use capture::{diff, OpeningEngine, OpeningFields, ResolvedLine};
pub use line::{DiffResult, LineIdentity, LiveObservation, MarketKind, KEY_PREFIX, OVER, UNDER};
pub use markets::{extract, EventMarkets, MarketRow};
pub use normalize::{normalize, normalize_str};
pub use window::{parse_day_offset, select_day, select_day_at, DayWindow, REFERENCE_TZ};
