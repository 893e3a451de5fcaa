//! Per-market outcome rows pulled out of one bookmaker's payload.

use odds_feed::{Event, Market, Outcome};
use serde::Serialize;
use tracing::debug;

use crate::line::{MarketKind, OVER, UNDER};
use crate::normalize::normalize_opt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketRow {
    pub side:  String,
    pub price: Option<f64>,
    pub point: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventMarkets {
    pub moneyline: Vec<MarketRow>,
    pub spreads:   Vec<MarketRow>,
    pub totals:    Vec<MarketRow>,
}

impl EventMarkets {
    pub fn rows(&self, kind: MarketKind) -> &[MarketRow] {
        match kind {
            MarketKind::Moneyline => &self.moneyline,
            MarketKind::Spread    => &self.spreads,
            MarketKind::Total     => &self.totals,
        }
    }
}

/// `None` when the event carries no quotes from `bookmaker`.
pub fn extract(event: &Event, bookmaker: &str) -> Option<EventMarkets> {
    let book = event.bookmaker(bookmaker)?;
    Some(EventMarkets {
        moneyline: moneyline(&book.markets, &event.away_team, &event.home_team),
        spreads:   spreads(&book.markets, &event.away_team, &event.home_team),
        totals:    totals(&book.markets),
    })
}

fn outcomes(markets: &[Market], kind: MarketKind) -> impl Iterator<Item = &Outcome> {
    markets
        .iter()
        .filter(move |m| m.key == kind.upstream_key())
        .flat_map(|m| m.outcomes.iter())
}

/// Exact team-name match; the last quote wins if the provider repeats one.
fn team_outcome<'a>(markets: &'a [Market], kind: MarketKind, team: &str) -> Option<&'a Outcome> {
    outcomes(markets, kind).filter(|o| o.name == team).last()
}

/// Always `[away, home]`, with empty quotes for a team the book doesn't price.
pub fn moneyline(markets: &[Market], away: &str, home: &str) -> Vec<MarketRow> {
    [away, home]
        .into_iter()
        .map(|team| MarketRow {
            side:  team.to_string(),
            price: team_outcome(markets, MarketKind::Moneyline, team).and_then(|o| normalize_opt(o.price.as_ref())),
            point: None,
        })
        .collect()
}

pub fn spreads(markets: &[Market], away: &str, home: &str) -> Vec<MarketRow> {
    [away, home]
        .into_iter()
        .map(|team| {
            let quote = team_outcome(markets, MarketKind::Spread, team);
            MarketRow {
                side:  team.to_string(),
                price: quote.and_then(|o| normalize_opt(o.price.as_ref())),
                point: quote.and_then(|o| normalize_opt(o.point.as_ref())),
            }
        })
        .collect()
}

/// Over/Under rows with normalized labels; Over first when both are present.
pub fn totals(markets: &[Market]) -> Vec<MarketRow> {
    let mut rows: Vec<MarketRow> = outcomes(markets, MarketKind::Total)
        .filter_map(|o| {
            let Some(side) = total_side(&o.name) else {
                debug!(name = %o.name, "unrecognized totals outcome");
                return None;
            };
            Some(MarketRow {
                side:  side.to_string(),
                price: normalize_opt(o.price.as_ref()),
                point: normalize_opt(o.point.as_ref()),
            })
        })
        .collect();

    if rows.len() == 2 {
        rows.sort_by_key(|r| r.side != OVER);
    }
    rows
}

pub fn total_side(name: &str) -> Option<&'static str> {
    let lower = name.trim().to_ascii_lowercase();
    if lower.starts_with("over") {
        Some(OVER)
    } else if lower.starts_with("under") {
        Some(UNDER)
    } else {
        None
    }
}
