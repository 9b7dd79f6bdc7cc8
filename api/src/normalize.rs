//! Provider record → canonical [`Game`].
//!
//! Each [`EventSchema`] variant knows how to read one provider shape into an
//! [`EventRecord`]; the record then becomes a `Game` with fallbacks applied.
//! Failures stay typed (`NormalizationError`) until the public [`normalize`]
//! boundary, where they are logged and collapsed to `None`.

use crate::registry::SportConfig;
use crate::wire::{FightRecord, FixtureRecord, GameRecord, WireId, WireSide, WireStatus};
use crate::Game;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub const UNKNOWN_LEAGUE: &str = "Unknown League";
pub const TBD: &str = "TBD";
pub const SCHEDULED: &str = "Scheduled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSchema {
    /// Soccer fixtures: `{fixture, league, teams}`.
    Fixture,
    /// Basketball / american football games: flat `{id, date, time, league, teams}`.
    Game,
    /// Combat sports: `{id, date, slug, fighters}`.
    Fight,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NormalizationError {
    #[error("not a {schema:?} record: {reason}")]
    Malformed { schema: EventSchema, reason: String },
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unparseable start time (date {date:?}, time {time:?})")]
    BadStartTime { date: String, time: Option<String> },
}

/// Provider-independent view of one event, before fallbacks are applied.
/// The filter engine matches against this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventRecord {
    pub id: String,
    pub league: Option<String>,
    pub home: Option<String>,
    pub away: Option<String>,
    pub date_text: Option<String>,
    pub time_text: Option<String>,
    pub status: Option<String>,
    pub venue: Option<String>,
}

impl EventRecord {
    /// The `YYYY-MM-DD` part of the provider's own date field, untouched by
    /// timezone conversion.
    pub fn event_date(&self) -> Option<&str> {
        let date = self.date_text.as_deref()?;
        Some(date.get(..10).unwrap_or(date))
    }

    pub fn into_game(self, config: &SportConfig) -> Game {
        let start_time = match reconstruct_start(self.date_text.as_deref(), self.time_text.as_deref()) {
            Ok(start) => start,
            Err(e) => {
                warn!("event {} ({}): {e}; start time left empty", self.id, config.api_source);
                None
            }
        };

        Game {
            id: self.id,
            sport: config.display_name.clone(),
            league: self.league.unwrap_or_else(|| UNKNOWN_LEAGUE.to_owned()),
            home_team: self.home.unwrap_or_else(|| TBD.to_owned()),
            away_team: self.away.unwrap_or_else(|| TBD.to_owned()),
            start_time,
            status: self.status.unwrap_or_else(|| SCHEDULED.to_owned()),
            venue: self.venue,
            api_source: config.api_source.clone(),
        }
    }
}

impl EventSchema {
    pub fn extract(self, raw: &Value) -> Result<EventRecord, NormalizationError> {
        match self {
            EventSchema::Fixture => extract_fixture(raw),
            EventSchema::Game => extract_game(raw),
            EventSchema::Fight => extract_fight(raw),
        }
    }

    fn read<'a, T: Deserialize<'a>>(self, raw: &'a Value) -> Result<T, NormalizationError> {
        T::deserialize(raw).map_err(|e| NormalizationError::Malformed {
            schema: self,
            reason: e.to_string(),
        })
    }
}

/// Normalize one raw provider record. Never panics; malformed input yields `None`.
pub fn normalize(config: &SportConfig, raw: &Value) -> Option<Game> {
    match try_normalize(config, raw) {
        Ok(game) => Some(game),
        Err(e) => {
            debug!("dropping {} record: {e}", config.sport_key);
            None
        }
    }
}

pub fn try_normalize(config: &SportConfig, raw: &Value) -> Result<Game, NormalizationError> {
    config.schema.extract(raw).map(|record| record.into_game(config))
}

// ---------------------------------------------------------------------------
// Per-schema extraction
// ---------------------------------------------------------------------------

fn extract_fixture(raw: &Value) -> Result<EventRecord, NormalizationError> {
    let rec: FixtureRecord = EventSchema::Fixture.read(raw)?;
    let fixture = rec.fixture.unwrap_or_default();
    let league = rec.league.unwrap_or_default();
    let teams = rec.teams.unwrap_or_default();
    let home = teams.home.unwrap_or_default();
    let away = teams.away.unwrap_or_default();

    let id = required(fixture.id.as_ref(), "fixture.id")?;
    required(league.id.as_ref(), "league.id")?;
    required(home.id.as_ref(), "teams.home.id")?;
    required(away.id.as_ref(), "teams.away.id")?;

    Ok(EventRecord {
        id,
        league: non_blank(league.name),
        home: non_blank(home.name),
        away: non_blank(away.name),
        date_text: non_blank(fixture.date),
        time_text: None,
        status: status_text(fixture.status),
        venue: fixture.venue.and_then(|v| v.display()),
    })
}

fn extract_game(raw: &Value) -> Result<EventRecord, NormalizationError> {
    let rec: GameRecord = EventSchema::Game.read(raw)?;
    let league = rec.league.unwrap_or_default();
    let teams = rec.teams.unwrap_or_default();
    let home = teams.home.unwrap_or_default();
    let away = teams.away.unwrap_or_default();

    let id = required(rec.id.as_ref(), "id")?;
    required(league.id.as_ref(), "league.id")?;
    required(home.id.as_ref(), "teams.home.id")?;
    required(away.id.as_ref(), "teams.away.id")?;

    Ok(EventRecord {
        id,
        league: non_blank(league.name),
        home: non_blank(home.name),
        away: non_blank(away.name),
        date_text: non_blank(rec.date),
        time_text: non_blank(rec.time),
        status: status_text(rec.status),
        venue: rec.venue.and_then(|v| v.display()),
    })
}

fn extract_fight(raw: &Value) -> Result<EventRecord, NormalizationError> {
    let rec: FightRecord = EventSchema::Fight.read(raw)?;
    let fighters = rec.fighters.unwrap_or_default();
    let first: WireSide = fighters.first.unwrap_or_default();
    let second: WireSide = fighters.second.unwrap_or_default();

    let id = required(rec.id.as_ref(), "id")?;
    required(first.id.as_ref(), "fighters.first.id")?;
    required(second.id.as_ref(), "fighters.second.id")?;

    Ok(EventRecord {
        id,
        league: non_blank(rec.slug).or_else(|| non_blank(rec.category)),
        home: non_blank(first.name),
        away: non_blank(second.name),
        date_text: non_blank(rec.date),
        time_text: non_blank(rec.time),
        status: status_text(rec.status),
        venue: rec.venue.and_then(|v| v.display()),
    })
}

fn required(id: Option<&WireId>, field: &'static str) -> Result<String, NormalizationError> {
    id.and_then(WireId::render)
        .ok_or(NormalizationError::MissingField(field))
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

fn status_text(status: Option<WireStatus>) -> Option<String> {
    match status? {
        WireStatus::Text(text) => non_blank(Some(text)),
        WireStatus::Detail { long, short } => non_blank(long).or_else(|| non_blank(short)),
    }
}

// ---------------------------------------------------------------------------
// Start time reconstruction
// ---------------------------------------------------------------------------

/// Rebuild a UTC start time from a provider date and optional separate time.
///
/// - full timestamp with offset → converted to UTC
/// - full timestamp without offset → read as UTC
/// - date + time → combined; UTC unless the time carries its own offset
/// - date only → UTC midnight
///
/// No date at all is `Ok(None)`; anything present but unreadable is an error.
pub fn reconstruct_start(
    date: Option<&str>,
    time: Option<&str>,
) -> Result<Option<DateTime<Utc>>, NormalizationError> {
    let Some(date) = date.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };
    let time = time.map(str::trim).filter(|t| !t.is_empty());
    let bad = || NormalizationError::BadStartTime {
        date: date.to_owned(),
        time: time.map(str::to_owned),
    };

    // Full timestamp in the date field; any separate time is redundant.
    if date.len() > 10 {
        return parse_timestamp(date).map(Some).ok_or_else(bad);
    }

    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| bad())?;
    let Some(time) = time else {
        return Ok(Some(Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))));
    };
    combine(day, time).map(Some).ok_or_else(bad)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%:z", "%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

fn combine(day: NaiveDate, time: &str) -> Option<DateTime<Utc>> {
    let (clock, offset) = split_offset(time);
    let clock = ["%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(clock, fmt).ok())?;
    let naive = day.and_time(clock);
    match offset {
        None => Some(Utc.from_utc_datetime(&naive)),
        Some(raw) => {
            let offset = parse_offset(raw)?;
            offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc))
        }
    }
}

/// Split "19:00:00+02:00" into ("19:00:00", Some("+02:00")).
fn split_offset(time: &str) -> (&str, Option<&str>) {
    match time.find(['+', '-', 'Z', 'z']) {
        Some(idx) => (&time[..idx], Some(&time[idx..])),
        None => (time, None),
    }
}

fn parse_offset(raw: &str) -> Option<FixedOffset> {
    if raw.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
