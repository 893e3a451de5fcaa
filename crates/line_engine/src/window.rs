//! Calendar-day event window in a fixed civil timezone.
//!
//! Day 0 is "today" on the reference wall clock, whatever zone the server
//! runs in. The window is half-open: local midnight of the day, inclusive, to
//! local midnight of the next day, exclusive (25h / 23h on DST change days).

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use odds_feed::Event;
use tracing::debug;

pub const REFERENCE_TZ: Tz = chrono_tz::America::New_York;
pub const MAX_DAY_OFFSET: u32 = 30;

/// Kickoff / as-of display format.
pub const LOCAL_FORMAT: &str = "%m/%d %I:%M %p";

pub fn clamp_day_offset(raw: i64) -> u32 {
    raw.clamp(0, MAX_DAY_OFFSET as i64) as u32
}

/// Query-string style input. Non-numeric → 0, numeric out of range → clamped.
pub fn parse_day_offset(raw: Option<&str>) -> u32 {
    let Some(raw) = raw.map(str::trim) else {
        return 0;
    };
    match raw.parse::<i64>() {
        Ok(v) => clamp_day_offset(v),
        // integers too long for i64 still clamp by sign
        Err(_) if is_integer(raw) => {
            if raw.starts_with('-') { 0 } else { MAX_DAY_OFFSET }
        }
        Err(_) => 0,
    }
}

fn is_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix(&['-', '+'][..]).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayWindow {
    pub tz:    Tz,
    pub start: DateTime<Tz>,
    pub end:   DateTime<Tz>,
}

impl DayWindow {
    pub fn for_offset(now: DateTime<Utc>, day_offset: u32, tz: Tz) -> Self {
        let today = now.with_timezone(&tz).date_naive();
        let day = today
            .checked_add_days(Days::new(day_offset.min(MAX_DAY_OFFSET) as u64))
            .unwrap_or(today);
        let next = day.succ_opt().unwrap_or(day);
        Self {
            tz,
            start: local_midnight(tz, day),
            end:   local_midnight(tz, next),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let local = instant.with_timezone(&self.tz);
        self.start <= local && local < self.end
    }
}

fn local_midnight(tz: Tz, day: NaiveDate) -> DateTime<Tz> {
    let naive = day.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        // zones whose DST jump skips midnight: first wall-clock instant after the gap
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

pub fn parse_kickoff(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn format_local(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format(LOCAL_FORMAT).to_string()
}

/// Events whose kickoff falls on the requested civil day. Unparseable
/// kickoffs are dropped, never raised.
pub fn select_day(events: Vec<Event>, day_offset: i64, tz: Tz) -> Vec<Event> {
    select_day_at(events, day_offset, tz, Utc::now())
}

pub fn select_day_at(events: Vec<Event>, day_offset: i64, tz: Tz, now: DateTime<Utc>) -> Vec<Event> {
    let window = DayWindow::for_offset(now, clamp_day_offset(day_offset), tz);
    events
        .into_iter()
        .filter(|ev| match parse_kickoff(&ev.commence_time) {
            Some(kickoff) => window.contains(kickoff),
            None => {
                debug!(event_id = %ev.id, raw = %ev.commence_time, "unparseable kickoff, skipping");
                false
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(raw: &str) -> DateTime<Utc> {
        parse_kickoff(raw).unwrap()
    }

    fn event(id: &str, kickoff: &str) -> Event {
        Event {
            id:            id.to_string(),
            sport_key:     None,
            home_team:     "Home".into(),
            away_team:     "Away".into(),
            commence_time: kickoff.to_string(),
            bookmakers:    vec![],
        }
    }

    fn ids(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    // noon in New York (EDT, UTC-4)
    const NOW: &str = "2026-10-19T16:00:00Z";

    #[test]
    fn window_is_half_open() {
        let events = vec![
            event("start", "2026-10-19T04:00:00Z"),
            event("before", "2026-10-19T03:59:59Z"),
            event("last-ns", "2026-10-20T03:59:59.999999999Z"),
            event("end", "2026-10-20T04:00:00Z"),
        ];
        let picked = select_day_at(events, 0, REFERENCE_TZ, at(NOW));
        assert_eq!(ids(&picked), vec!["start", "last-ns"]);
    }

    #[test]
    fn day_offset_is_clamped() {
        let now = at(NOW);
        let events = || vec![
            event("today", "2026-10-19T20:00:00Z"),
            event("day30", "2026-11-18T20:00:00Z"),
        ];
        assert_eq!(ids(&select_day_at(events(), -5, REFERENCE_TZ, now)), vec!["today"]);
        assert_eq!(ids(&select_day_at(events(), 999, REFERENCE_TZ, now)), vec!["day30"]);
        assert_eq!(
            DayWindow::for_offset(now, clamp_day_offset(999), REFERENCE_TZ),
            DayWindow::for_offset(now, 30, REFERENCE_TZ)
        );
    }

    #[test]
    fn select_day_on_wall_clock_keeps_one_civil_day() {
        let now = Utc::now();
        let hourly = || -> Vec<Event> {
            (-48..=48)
                .map(|h| event(&h.to_string(), &(now + Duration::hours(h)).to_rfc3339()))
                .chain([event("garbage", "soon")])
                .collect()
        };

        // an hourly grid lands exactly 23, 24 or 25 kickoffs in a half-open civil day
        let today = select_day(hourly(), 0, REFERENCE_TZ);
        let tomorrow = select_day(hourly(), 1, REFERENCE_TZ);
        assert!((23..=25).contains(&today.len()), "{}", today.len());
        assert!((23..=25).contains(&tomorrow.len()), "{}", tomorrow.len());
        assert!(today.iter().all(|ev| !tomorrow.contains(ev)));
        assert!(!ids(&today).contains(&"garbage"));
    }

    #[test]
    fn malformed_kickoff_is_excluded_not_fatal() {
        let events = vec![
            event("ok", "2026-10-19T20:00:00Z"),
            event("garbage", "tomorrow-ish"),
            event("empty", ""),
        ];
        assert_eq!(ids(&select_day_at(events, 0, REFERENCE_TZ, at(NOW))), vec!["ok"]);
    }

    #[test]
    fn today_follows_reference_clock_not_utc() {
        // 22:00 on Oct 19 in New York, already Oct 20 in UTC
        let now = at("2026-10-20T02:00:00Z");
        let events = vec![
            event("late-et", "2026-10-20T01:00:00Z"),
            event("next-day", "2026-10-20T17:00:00Z"),
        ];
        assert_eq!(ids(&select_day_at(events.clone(), 0, REFERENCE_TZ, now)), vec!["late-et"]);
        assert_eq!(ids(&select_day_at(events, 1, REFERENCE_TZ, now)), vec!["next-day"]);
    }

    #[test]
    fn dst_fall_back_day_is_25_hours() {
        // DST ends in New York on 2026-11-01
        let window = DayWindow::for_offset(at("2026-11-01T12:00:00Z"), 0, REFERENCE_TZ);
        assert_eq!(window.start.with_timezone(&Utc), at("2026-11-01T04:00:00Z"));
        assert_eq!(window.end.with_timezone(&Utc), at("2026-11-02T05:00:00Z"));
        assert!(window.contains(at("2026-11-02T04:30:00Z")));
    }

    #[test]
    fn parses_day_offset_input() {
        assert_eq!(parse_day_offset(None), 0);
        assert_eq!(parse_day_offset(Some("7")), 7);
        assert_eq!(parse_day_offset(Some(" 2 ")), 2);
        assert_eq!(parse_day_offset(Some("-5")), 0);
        assert_eq!(parse_day_offset(Some("999")), 30);
        assert_eq!(parse_day_offset(Some("99999999999999999999999")), 30);
        assert_eq!(parse_day_offset(Some("tomorrow")), 0);
        assert_eq!(parse_day_offset(Some("1.5")), 0);
    }

    #[test]
    fn formats_kickoff_in_reference_zone() {
        assert_eq!(format_local(at("2026-10-19T23:05:00Z"), REFERENCE_TZ), "10/19 07:05 PM");
    }
}
