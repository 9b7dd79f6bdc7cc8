pub mod cache;
pub mod client;
pub mod enrich;
pub mod filter;
pub mod finder;
pub mod geo;
pub mod normalize;
pub mod registry;
pub mod store;
pub mod window;
pub mod wire;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use client::{ApiError, ApiResult, SportsClient};
pub use finder::{FinderConfig, ScreeningFinder};
pub use registry::{SportConfig, SportRegistry};

// ---------------------------------------------------------------------------
// Domain types: clean model, independent of any provider wire format
// ---------------------------------------------------------------------------

/// Canonical game record. Only produced by the normalizers; `id` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub sport: String,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    /// `None` when the provider's date/time could not be reconstructed.
    pub start_time: Option<DateTime<Utc>>,
    pub status: String,
    pub venue: Option<String>,
    pub api_source: String,
}

/// Search criteria for `search_games`. Blank strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub sport: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub league: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date: Option<String>,
}

impl SearchQuery {
    pub fn for_sport(sport: impl Into<String>) -> Self {
        Self { sport: sport.into(), ..Default::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Bar {
    /// Both coordinates, when present and finite.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.latitude.filter(|v| v.is_finite())?;
        let lon = self.longitude.filter(|v| v.is_finite())?;
        Some((lat, lon))
    }
}

/// A bar as returned by the proximity filter. `distance_km` is only set when
/// the caller supplied a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarWithDistance {
    #[serde(flatten)]
    pub bar: Bar,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screening {
    #[serde(default)]
    pub id: Option<i64>,
    pub bar_id: i64,
    #[serde(default)]
    pub external_game_id: Option<String>,
    pub screening_time: DateTime<Utc>,
}

/// Anything that references an upstream game. Lets the enrichment join work on
/// caller-owned screening rows without copying them into a core type.
pub trait ScreeningLike {
    fn external_game_id(&self) -> Option<&str>;
}

impl ScreeningLike for Screening {
    fn external_game_id(&self) -> Option<&str> {
        self.external_game_id.as_deref()
    }
}

pub const DETAILS_NOT_AVAILABLE: &str = "Details not available";

/// Game attached to a screening: resolved, or a placeholder carrying the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GameSlot {
    Resolved(Game),
    Unavailable { id: Option<String>, error: String },
}

impl GameSlot {
    pub fn unavailable(id: Option<&str>) -> Self {
        GameSlot::Unavailable {
            id: id.map(str::to_owned),
            error: DETAILS_NOT_AVAILABLE.to_owned(),
        }
    }

    pub fn game(&self) -> Option<&Game> {
        match self {
            GameSlot::Resolved(game) => Some(game),
            GameSlot::Unavailable { .. } => None,
        }
    }
}

/// A screening with its game joined in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enriched<S> {
    #[serde(flatten)]
    pub screening: S,
    pub game: GameSlot,
}

/// A game and every screening scheduled for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameScreenings {
    pub game: Game,
    pub screenings: Vec<Screening>,
}
