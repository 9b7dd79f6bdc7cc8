//! `ScreeningFinder` ties the pieces together: registry lookup, cached window
//! fetch, filtering, detail lookups, the screening join and the proximity
//! filter.

use crate::cache::{MemoryCache, ResultCache, DEFAULT_TTL};
use crate::client::{ApiError, ApiResult, SportsClient};
use crate::enrich::enrich;
use crate::filter::GameFilter;
use crate::geo::{filter_by_distance, DEFAULT_RADIUS_KM};
use crate::registry::SportRegistry;
use crate::store::ScreeningStore;
use crate::window::{covers, fetch_window};
use crate::{BarWithDistance, Enriched, Game, GameScreenings, Screening, ScreeningLike, SearchQuery};
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_WINDOW_DAYS: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct FinderConfig {
    /// Days fetched per search, starting today.
    pub window_days: u32,
    pub cache_ttl: Duration,
    pub default_radius_km: f64,
    /// Adapter used for detail lookups that do not name a sport.
    pub detail_sport: String,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            cache_ttl: DEFAULT_TTL,
            default_radius_km: DEFAULT_RADIUS_KM,
            detail_sport: "soccer".into(),
        }
    }
}

#[derive(Clone)]
pub struct ScreeningFinder {
    client: SportsClient,
    registry: SportRegistry,
    cache: Arc<dyn ResultCache>,
    store: Option<Arc<dyn ScreeningStore>>,
    config: FinderConfig,
}

impl ScreeningFinder {
    pub fn new(client: SportsClient, registry: SportRegistry) -> Self {
        Self {
            client,
            registry,
            cache: Arc::new(MemoryCache::new()),
            store: None,
            config: FinderConfig::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ScreeningStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_config(mut self, config: FinderConfig) -> Self {
        self.config = config;
        self
    }

    /// Games for a sport matching the optional team, league and date criteria.
    pub async fn search_games(&self, query: &SearchQuery) -> ApiResult<Vec<Game>> {
        self.search_games_on(query, Utc::now().date_naive()).await
    }

    /// `search_games` with an explicit "today". A date criterion outside the
    /// default window is fetched on its own instead.
    pub async fn search_games_on(&self, query: &SearchQuery, today: NaiveDate) -> ApiResult<Vec<Game>> {
        let sport = self.registry.resolve(&query.sport)?;
        let filter = GameFilter::from_query(query);

        let window_days = self.config.window_days.max(1);
        let requested = filter
            .date()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        let (start, days) = match requested {
            Some(date) if !covers(today, window_days, date) => {
                debug!("{date} is outside the default window; fetching it alone");
                (date, 1)
            }
            _ => (today, window_days),
        };

        let raw = fetch_window(
            &self.client,
            sport,
            self.cache.as_ref(),
            self.config.cache_ttl,
            start,
            days,
        )
        .await?;
        let games = filter.apply(sport, &raw);
        info!("{} {} games matched out of {}", games.len(), sport.sport_key, raw.len());
        Ok(games)
    }

    /// Detail lookup through the configured detail sport.
    pub async fn game_details(&self, game_id: &str) -> ApiResult<Option<Game>> {
        self.game_details_in(&self.config.detail_sport, game_id).await
    }

    pub async fn game_details_in(&self, sport: &str, game_id: &str) -> ApiResult<Option<Game>> {
        let sport = self.registry.resolve(sport)?;
        self.client.fetch_game_detail(sport, game_id).await
    }

    /// Attach game details to caller-supplied screenings. Only a misconfigured
    /// detail sport is an error; lookup failures become placeholders.
    pub async fn enrich_screenings<S: ScreeningLike>(&self, screenings: Vec<S>) -> ApiResult<Vec<Enriched<S>>> {
        let sport = self.registry.resolve(&self.config.detail_sport)?;
        let client = &self.client;
        Ok(enrich(screenings, |id| async move { client.fetch_game_detail(sport, &id).await }).await)
    }

    /// Bars showing a game. With a location, only bars within the radius
    /// (default from config) are returned, nearest first.
    pub async fn bars_for_game(
        &self,
        game_id: &str,
        lat: Option<f64>,
        lon: Option<f64>,
        radius_km: Option<f64>,
    ) -> ApiResult<Vec<BarWithDistance>> {
        let bars = self.store()?.bars_showing_game(game_id).await?;
        let radius = radius_km
            .filter(|r| r.is_finite() && *r >= 0.0)
            .unwrap_or(self.config.default_radius_km);
        Ok(filter_by_distance(bars, lat, lon, radius))
    }

    /// Every stored screening, earliest first, with game details attached.
    pub async fn all_screenings(&self) -> ApiResult<Vec<Enriched<Screening>>> {
        let screenings = self.store()?.all_screenings().await?;
        self.enrich_screenings(screenings).await
    }

    pub async fn upcoming_screenings(&self, now: DateTime<Utc>) -> ApiResult<Vec<Enriched<Screening>>> {
        let screenings = self.store()?.upcoming_screenings(now).await?;
        self.enrich_screenings(screenings).await
    }

    pub async fn screenings_for_bar(&self, bar_id: i64) -> ApiResult<Vec<Enriched<Screening>>> {
        let screenings = self.store()?.screenings_for_bar(bar_id).await?;
        self.enrich_screenings(screenings).await
    }

    /// `Ok(None)` when the game itself is unknown upstream.
    pub async fn screenings_for_game(&self, game_id: &str) -> ApiResult<Option<GameScreenings>> {
        let store = self.store()?;
        let Some(game) = self.game_details(game_id).await? else {
            return Ok(None);
        };
        let screenings = store.screenings_for_game(game_id).await?;
        Ok(Some(GameScreenings { game, screenings }))
    }

    /// Populate the cache for a sport's default window. Returns the number of
    /// raw events now cached.
    pub async fn warm(&self, sport: &str) -> ApiResult<usize> {
        let sport = self.registry.resolve(sport)?;
        let raw = fetch_window(
            &self.client,
            sport,
            self.cache.as_ref(),
            self.config.cache_ttl,
            Utc::now().date_naive(),
            self.config.window_days,
        )
        .await?;
        Ok(raw.len())
    }

    fn store(&self) -> ApiResult<&dyn ScreeningStore> {
        self.store.as_deref().ok_or(ApiError::NoStore)
    }
}
