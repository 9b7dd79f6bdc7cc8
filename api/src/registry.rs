//! Per-sport adapter table: sport key → upstream access parameters + normalizer.

use crate::client::{ApiError, ApiResult};
use crate::normalize::EventSchema;
use std::collections::HashMap;

/// Where the static API key travels on each upstream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeyPlacement {
    Header(String),
    Query(String),
}

impl Default for ApiKeyPlacement {
    fn default() -> Self {
        ApiKeyPlacement::Header("x-apisports-key".into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SportConfig {
    /// Canonical lowercase lookup key, e.g. "soccer".
    pub sport_key: String,
    /// Human label written into `Game::sport`.
    pub display_name: String,
    pub upstream_base: String,
    pub events_endpoint: String,
    pub detail_endpoint: String,
    pub date_param: String,
    pub id_param: String,
    pub auth: ApiKeyPlacement,
    pub api_source: String,
    pub schema: EventSchema,
}

impl SportConfig {
    fn api_sports(
        key: &str,
        display: &str,
        host: &str,
        endpoint: &str,
        source: &str,
        schema: EventSchema,
    ) -> Self {
        Self {
            sport_key: key.into(),
            display_name: display.into(),
            upstream_base: format!("https://{host}"),
            events_endpoint: endpoint.into(),
            detail_endpoint: endpoint.into(),
            date_param: "date".into(),
            id_param: "id".into(),
            auth: ApiKeyPlacement::default(),
            api_source: source.into(),
            schema,
        }
    }

    pub fn events_url(&self) -> String {
        join_url(&self.upstream_base, &self.events_endpoint)
    }

    pub fn detail_url(&self) -> String {
        join_url(&self.upstream_base, &self.detail_endpoint)
    }
}

fn join_url(base: &str, endpoint: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), endpoint.trim_start_matches('/'))
}

/// Read-only after construction; built once at process start.
#[derive(Debug, Clone)]
pub struct SportRegistry {
    sports: HashMap<String, SportConfig>,
}

impl Default for SportRegistry {
    fn default() -> Self {
        Self::new(vec![
            SportConfig::api_sports(
                "soccer",
                "Soccer",
                "v3.football.api-sports.io",
                "fixtures",
                "api-football",
                EventSchema::Fixture,
            ),
            SportConfig::api_sports(
                "basketball",
                "Basketball",
                "v1.basketball.api-sports.io",
                "games",
                "api-basketball",
                EventSchema::Game,
            ),
            SportConfig::api_sports(
                "american-football",
                "American Football",
                "v1.american-football.api-sports.io",
                "games",
                "api-american-football",
                EventSchema::Game,
            ),
            SportConfig::api_sports(
                "mma",
                "MMA",
                "v1.mma.api-sports.io",
                "fights",
                "api-mma",
                EventSchema::Fight,
            ),
        ])
    }
}

impl SportRegistry {
    pub fn new(configs: Vec<SportConfig>) -> Self {
        let sports = configs
            .into_iter()
            .map(|c| (canonical_key(&c.sport_key), c))
            .collect();
        Self { sports }
    }

    /// Resolve a user-supplied sport name. Case-insensitive and trimmed; never
    /// touches the network.
    pub fn resolve(&self, sport: &str) -> ApiResult<&SportConfig> {
        let key = canonical_key(sport);
        if key.is_empty() {
            return Err(ApiError::MissingSport);
        }
        self.sports
            .get(&key)
            .ok_or_else(|| ApiError::UnsupportedSport(sport.trim().to_owned()))
    }

    /// Point a sport at a different upstream base (staging, mocks).
    pub fn override_base(&mut self, sport: &str, base: impl Into<String>) -> ApiResult<()> {
        let key = canonical_key(sport);
        let config = self
            .sports
            .get_mut(&key)
            .ok_or_else(|| ApiError::UnsupportedSport(sport.trim().to_owned()))?;
        config.upstream_base = base.into();
        Ok(())
    }

    /// Point every sport at one base URL. Used by tests against a mock server.
    pub fn with_base_for_all(mut self, base: &str) -> Self {
        for config in self.sports.values_mut() {
            config.upstream_base = base.to_owned();
        }
        self
    }

    pub fn set_auth(&mut self, auth: ApiKeyPlacement) {
        for config in self.sports.values_mut() {
            config.auth = auth.clone();
        }
    }

    pub fn sport_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.sports.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

fn canonical_key(sport: &str) -> String {
    sport.trim().to_lowercase()
}
