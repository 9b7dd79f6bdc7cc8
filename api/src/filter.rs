//! Local filtering of a fetched window against user criteria.

use crate::registry::SportConfig;
use crate::{Game, SearchQuery};
use log::debug;
use serde_json::Value;

/// Normalized criteria. Text comparisons are case-insensitive substring
/// matches; the date is an exact `YYYY-MM-DD` match on the provider's date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameFilter {
    team: Option<String>,
    league: Option<String>,
    date: Option<String>,
}

impl GameFilter {
    pub fn from_query(query: &SearchQuery) -> Self {
        Self {
            team: lowered(query.team.as_deref()),
            league: lowered(query.league.as_deref()),
            date: query
                .date
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_owned),
        }
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.team.is_none() && self.league.is_none() && self.date.is_none()
    }

    /// Normalize `raw` and keep the games matching every set criterion, in
    /// input order. Records that fail normalization are dropped.
    pub fn apply(&self, sport: &SportConfig, raw: &[Value]) -> Vec<Game> {
        let mut dropped = 0;
        let games: Vec<Game> = raw
            .iter()
            .filter_map(|value| match sport.schema.extract(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    dropped += 1;
                    debug!("skipping {} record: {e}", sport.sport_key);
                    None
                }
            })
            .filter(|record| {
                self.matches(
                    record.league.as_deref(),
                    record.home.as_deref(),
                    record.away.as_deref(),
                    record.event_date(),
                )
            })
            .map(|record| record.into_game(sport))
            .collect();
        if dropped > 0 {
            debug!("{dropped} of {} {} records failed normalization", raw.len(), sport.sport_key);
        }
        games
    }

    fn matches(
        &self,
        league: Option<&str>,
        home: Option<&str>,
        away: Option<&str>,
        date: Option<&str>,
    ) -> bool {
        if let Some(wanted) = &self.league {
            if !contains(league, wanted) {
                return false;
            }
        }
        if let Some(wanted) = &self.team {
            if !contains(home, wanted) && !contains(away, wanted) {
                return false;
            }
        }
        if let Some(wanted) = &self.date {
            if date != Some(wanted.as_str()) {
                return false;
            }
        }
        true
    }
}

fn lowered(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase)
}

fn contains(field: Option<&str>, needle: &str) -> bool {
    field.is_some_and(|f| f.to_lowercase().contains(needle))
}
