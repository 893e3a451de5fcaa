//! Board assembly: provider payload → day window → market rows → openings & diffs.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures_util::future::join_all;
use logger::{now_iso, BoardServedEvent, EventLogger};
use odds_feed::{Event, FeedError, OddsProvider, ALL_MARKETS};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::ResponseCache;
use crate::capture::{OpeningEngine, ResolvedLine};
use crate::line::{LineIdentity, LiveObservation, MarketKind};
use crate::markets::{extract, EventMarkets};
use crate::window::{clamp_day_offset, format_local, parse_kickoff, select_day_at};

// ── Output rows ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoneylineLine {
    pub team:       String,
    pub open_price: Option<f64>,
    pub live_price: Option<f64>,
    pub diff_price: Option<f64>,
}

/// Spread or total row. `open_price` / `diff_price` stay empty unless the
/// engine locks prices for point markets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointLine {
    pub team:       String,
    pub open_point: Option<f64>,
    pub open_price: Option<f64>,
    pub live_point: Option<f64>,
    pub live_price: Option<f64>,
    pub diff_point: Option<f64>,
    pub diff_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameLines {
    pub event_id:            String,
    pub sport:               String,
    pub bookmaker:           String,
    pub away_team:           String,
    pub home_team:           String,
    pub commence_time_local: String,
    pub moneyline:           Vec<MoneylineLine>,
    pub spreads:             Vec<PointLine>,
    pub totals:              Vec<PointLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Board {
    pub as_of_local: String,
    pub sport:       String,
    pub bookmaker:   String,
    pub day_offset:  u32,
    pub games:       Vec<GameLines>,
}

#[derive(Error, Debug)]
pub enum BoardError {
    /// Upstream odds unavailable for this request; nothing is cached.
    #[error("odds unavailable: {0}")]
    Provider(#[from] FeedError),
}

// ── Service ──────────────────────────────────────────────────────────────────

pub struct BoardService {
    provider: Arc<dyn OddsProvider>,
    engine:   Arc<OpeningEngine>,
    cache:    ResponseCache<Board>,
    tz:       Tz,
    clock:    fn() -> DateTime<Utc>,
    audit:    Option<EventLogger>,
}

impl BoardService {
    pub fn new(
        provider:  Arc<dyn OddsProvider>,
        engine:    Arc<OpeningEngine>,
        tz:        Tz,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            provider,
            engine,
            cache: ResponseCache::new(cache_ttl),
            tz,
            clock: Utc::now,
            audit: None,
        }
    }

    #[cfg(test)]
    fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_audit(mut self, logger: EventLogger) -> Self {
        self.audit = Some(logger);
        self
    }

    pub async fn board(&self, sport: &str, bookmaker: &str, day_offset: i64) -> Result<Arc<Board>, BoardError> {
        let day_offset = clamp_day_offset(day_offset);
        if let Some(hit) = self.cache.get(sport, bookmaker, day_offset) {
            debug!(sport, bookmaker, day_offset, "board cache hit");
            return Ok(hit);
        }

        let events = self.provider.fetch_odds(sport, bookmaker, ALL_MARKETS).await?;
        let upstream = events.len();
        let now = (self.clock)();

        let selected = select_day_at(events, day_offset as i64, self.tz, now);
        let games = join_all(selected.iter().filter_map(|ev| {
            let markets = extract(ev, bookmaker)?;
            Some(self.assemble(sport, bookmaker, ev, markets))
        }))
        .await;

        info!(sport, bookmaker, day_offset, upstream, games = games.len(), "board assembled");
        if let Some(audit) = &self.audit {
            audit.log_or_warn(&BoardServedEvent {
                ts:         now_iso(),
                event:      "BOARD_SERVED",
                sport:      sport.to_string(),
                bookmaker:  bookmaker.to_string(),
                day_offset,
                games:      games.len(),
                upstream,
            });
        }

        let board = Arc::new(Board {
            as_of_local: format_local(now, self.tz),
            sport:       sport.to_string(),
            bookmaker:   bookmaker.to_string(),
            day_offset,
            games,
        });
        self.cache.put(sport, bookmaker, day_offset, board.clone());
        Ok(board)
    }

    async fn assemble(&self, sport: &str, bookmaker: &str, ev: &Event, markets: EventMarkets) -> GameLines {
        let by_kind = &markets;
        let observations: Vec<LiveObservation> = MarketKind::ALL
            .into_iter()
            .flat_map(move |kind| {
                by_kind.rows(kind).iter().map(move |row| LiveObservation {
                    identity: LineIdentity::new(sport, bookmaker, ev.id.as_str(), kind, row.side.as_str()),
                    price:    row.price,
                    point:    row.point,
                })
            })
            .collect();

        let resolved = self.engine.observe_all(&observations).await;

        let mut game = GameLines {
            event_id:            ev.id.clone(),
            sport:               sport.to_string(),
            bookmaker:           bookmaker.to_string(),
            away_team:           ev.away_team.clone(),
            home_team:           ev.home_team.clone(),
            commence_time_local: parse_kickoff(&ev.commence_time)
                .map(|t| format_local(t, self.tz))
                .unwrap_or_default(),
            moneyline:           Vec::new(),
            spreads:             Vec::new(),
            totals:              Vec::new(),
        };

        for (obs, line) in observations.into_iter().zip(resolved) {
            match obs.identity.market {
                MarketKind::Moneyline => game.moneyline.push(moneyline_line(obs, line)),
                MarketKind::Spread    => game.spreads.push(point_line(obs, line)),
                MarketKind::Total     => game.totals.push(point_line(obs, line)),
            }
        }
        game
    }
}

fn moneyline_line(obs: LiveObservation, line: ResolvedLine) -> MoneylineLine {
    MoneylineLine {
        team:       obs.identity.side,
        open_price: line.opening.and_then(|o| o.price),
        live_price: obs.price,
        diff_price: line.diff.price_diff,
    }
}

fn point_line(obs: LiveObservation, line: ResolvedLine) -> PointLine {
    PointLine {
        team:       obs.identity.side,
        open_point: line.opening.as_ref().and_then(|o| o.point),
        open_price: line.opening.as_ref().and_then(|o| o.price),
        live_point: obs.point,
        live_price: obs.price,
        diff_point: line.diff.point_diff,
        diff_price: line.diff.price_diff,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::OpeningFields;
    use crate::window::{DayWindow, REFERENCE_TZ};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use opening_store::{MemoryKv, OpeningStore};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubProvider {
        events: Mutex<Vec<Event>>,
        fail:   Mutex<bool>,
        calls:  AtomicUsize,
    }

    impl StubProvider {
        fn new(events: Vec<Event>) -> Self {
            Self { events: Mutex::new(events), fail: Mutex::new(false), calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl OddsProvider for StubProvider {
        async fn fetch_odds(&self, _sport: &str, _bookmaker: &str, markets: &[&str]) -> Result<Vec<Event>, FeedError> {
            assert_eq!(markets, ALL_MARKETS);
            self.calls.fetch_add(1, Ordering::SeqCst);
            if *self.fail.lock().unwrap() {
                return Err(FeedError::Status { status: 503, body: "down".into() });
            }
            Ok(self.events.lock().unwrap().clone())
        }
    }

    // 12:00 in New York
    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 10, 16, 0, 0).unwrap()
    }

    fn kickoff(minutes_after_midnight: i64) -> String {
        let window = DayWindow::for_offset(noon(), 0, REFERENCE_TZ);
        (window.start + chrono::Duration::minutes(minutes_after_midnight))
            .with_timezone(&Utc)
            .to_rfc3339()
    }

    fn game(id: &str, start: String, away_price: i64, book: &str) -> Event {
        serde_json::from_value(json!({
            "id": id,
            "home_team": "New York Yankees",
            "away_team": "Boston Red Sox",
            "commence_time": start,
            "bookmakers": [{
                "key": book,
                "markets": [
                    {"key": "h2h", "outcomes": [
                        {"name": "Boston Red Sox", "price": format!("{away_price:+}")},
                        {"name": "New York Yankees", "price": -150}
                    ]},
                    {"key": "spreads", "outcomes": [
                        {"name": "Boston Red Sox", "price": -190, "point": 1.5},
                        {"name": "New York Yankees", "price": 160, "point": -1.5}
                    ]},
                    {"key": "totals", "outcomes": [
                        {"name": "Under", "price": -105, "point": 8.5},
                        {"name": "Over", "price": -115, "point": 8.5}
                    ]}
                ]
            }]
        }))
        .unwrap()
    }

    fn service(provider: Arc<StubProvider>, kv: Arc<MemoryKv>, cache_ttl: Duration) -> BoardService {
        let store = OpeningStore::new(kv, Duration::from_secs(14 * 86_400), Duration::from_secs(3));
        let engine = Arc::new(OpeningEngine::new(store, OpeningFields::PointOnly));
        BoardService::new(provider, engine, REFERENCE_TZ, cache_ttl).with_clock(noon)
    }

    #[tokio::test]
    async fn assembles_only_todays_games_for_the_bookmaker() {
        let provider = Arc::new(StubProvider::new(vec![
            game("E1", kickoff(60), 130, "draftkings"),
            game("E2", kickoff(-60), 130, "draftkings"),
            game("E3", kickoff(120), 130, "fanduel"),
            game("E4", "not-a-date".into(), 130, "draftkings"),
        ]));
        let kv = Arc::new(MemoryKv::new());
        let board = service(provider, kv.clone(), Duration::ZERO)
            .board("baseball_mlb", "draftkings", 0)
            .await
            .unwrap();

        assert_eq!(board.games.len(), 1);
        let g = &board.games[0];
        assert_eq!(g.event_id, "E1");
        assert_eq!(g.moneyline[0].team, "Boston Red Sox");
        assert_eq!(g.moneyline[0].open_price, Some(130.0));
        assert_eq!(g.moneyline[0].diff_price, Some(0.0));
        assert_eq!(g.spreads[1].open_point, Some(-1.5));
        assert_eq!(g.spreads[1].open_price, None);
        assert_eq!(g.spreads[1].live_price, Some(160.0));
        assert_eq!(g.totals[0].team, "Over");
        assert!(g.commence_time_local.ends_with("AM"));

        // 2 moneyline + 2 spread + 2 total openings
        assert_eq!(kv.created(), 6);
    }

    #[tokio::test]
    async fn later_board_diffs_against_first_sight() {
        let provider = Arc::new(StubProvider::new(vec![game("E1", kickoff(60), 130, "draftkings")]));
        let kv = Arc::new(MemoryKv::new());
        let svc = service(provider.clone(), kv, Duration::ZERO);

        svc.board("baseball_mlb", "draftkings", 0).await.unwrap();
        *provider.events.lock().unwrap() = vec![game("E1", kickoff(60), 115, "draftkings")];
        let board = svc.board("baseball_mlb", "draftkings", 0).await.unwrap();

        let away = &board.games[0].moneyline[0];
        assert_eq!(away.open_price, Some(130.0));
        assert_eq!(away.live_price, Some(115.0));
        assert_eq!(away.diff_price, Some(-15.0));
    }

    #[tokio::test]
    async fn store_outage_still_serves_odds() {
        let provider = Arc::new(StubProvider::new(vec![game("E1", kickoff(60), 130, "draftkings")]));
        let kv = Arc::new(MemoryKv::new());
        kv.set_offline(true);

        let board = service(provider, kv, Duration::ZERO)
            .board("baseball_mlb", "draftkings", 0)
            .await
            .unwrap();
        let row = &board.games[0].moneyline[1];
        assert_eq!(row.live_price, Some(-150.0));
        assert_eq!(row.open_price, None);
        assert_eq!(row.diff_price, None);
    }

    #[tokio::test]
    async fn cache_serves_repeat_requests_but_not_failures() {
        let provider = Arc::new(StubProvider::new(vec![]));
        let svc = service(provider.clone(), Arc::new(MemoryKv::new()), Duration::from_secs(30));

        *provider.fail.lock().unwrap() = true;
        assert!(matches!(
            svc.board("baseball_mlb", "draftkings", 0).await,
            Err(BoardError::Provider(FeedError::Status { status: 503, .. }))
        ));
        *provider.fail.lock().unwrap() = false;

        let first = svc.board("baseball_mlb", "draftkings", 0).await.unwrap();
        let second = svc.board("baseball_mlb", "draftkings", -3).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

        svc.board("baseball_mlb", "draftkings", 1).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }
}
