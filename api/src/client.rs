use crate::normalize;
use crate::registry::{ApiKeyPlacement, SportConfig};
use crate::wire::{provider_errors, unwrap_events};
use crate::Game;
use chrono::NaiveDate;
use log::debug;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no sport given")]
    MissingSport,
    #[error("unsupported sport: {0}")]
    UnsupportedSport(String),
    #[error("invalid upstream url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("network error for {url}: {source}")]
    Network { url: String, source: reqwest::Error },
    #[error("upstream returned {status} for {url}")]
    Status { url: String, status: StatusCode },
    #[error("parse error for {url}: {source}")]
    Parsing { url: String, source: reqwest::Error },
    #[error("provider error for {url}: {message}")]
    Provider { url: String, message: String },
    #[error("every upstream request failed for {sport} ({attempts} attempted)")]
    UpstreamExhausted { sport: String, attempts: usize },
    #[error("screening store error: {0}")]
    Store(#[from] crate::store::StoreError),
    #[error("no screening store configured")]
    NoStore,
}

impl ApiError {
    /// Rejections caused by the request itself rather than by upstream trouble.
    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::MissingSport | ApiError::UnsupportedSport(_))
    }

    /// Text safe to show to an end user. Diagnostics stay in `Display` / logs.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::MissingSport => "A sport is required.".into(),
            ApiError::UnsupportedSport(sport) => format!("Sport '{sport}' is not supported."),
            ApiError::Store(_) | ApiError::NoStore => "Error fetching screenings.".into(),
            _ => "Error fetching games data.".into(),
        }
    }
}

/// HTTP access to the sports-data providers. One instance is shared by every
/// sport; per-sport parameters come from [`SportConfig`].
#[derive(Debug, Clone)]
pub struct SportsClient {
    client: Client,
    api_key: Option<String>,
    timeout: Duration,
}

impl Default for SportsClient {
    fn default() -> Self {
        Self::new(None, DEFAULT_TIMEOUT)
    }
}

impl SportsClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .user_agent("barwatch/0.1 (screening finder)")
                .build()
                .unwrap_or_default(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout,
        }
    }

    /// Fetch one calendar day of raw events for a sport.
    pub async fn fetch_day(&self, sport: &SportConfig, date: NaiveDate) -> ApiResult<Vec<Value>> {
        let day = date.format("%Y-%m-%d").to_string();
        let body = self
            .get(sport, &sport.events_url(), &[(sport.date_param.as_str(), day.as_str())])
            .await?;
        Ok(unwrap_events(&body).cloned().unwrap_or_default())
    }

    /// Fetch a single event by id. `Ok(None)` when the provider has no such
    /// event or returns a record that does not normalize.
    pub async fn fetch_game_detail(&self, sport: &SportConfig, game_id: &str) -> ApiResult<Option<Game>> {
        let body = self
            .get(sport, &sport.detail_url(), &[(sport.id_param.as_str(), game_id)])
            .await?;
        let game = unwrap_events(&body)
            .and_then(|events| events.first())
            .and_then(|raw| normalize::normalize(sport, raw));
        if game.is_none() {
            debug!("no {} event found for id {game_id}", sport.sport_key);
        }
        Ok(game)
    }

    async fn get(&self, sport: &SportConfig, base: &str, params: &[(&str, &str)]) -> ApiResult<Value> {
        let mut query: Vec<(&str, &str)> = params.to_vec();
        if let (ApiKeyPlacement::Query(name), Some(key)) = (&sport.auth, &self.api_key) {
            query.push((name.as_str(), key.as_str()));
        }
        let url = Url::parse_with_params(base, &query).map_err(|e| ApiError::InvalidUrl {
            url: base.to_owned(),
            reason: e.to_string(),
        })?;
        // Never log the key-bearing query string.
        let label = format!("{base} {params:?}");
        debug!("GET {label}");

        let mut request = self.client.get(url).timeout(self.timeout);
        if let (ApiKeyPlacement::Header(name), Some(key)) = (&sport.auth, &self.api_key) {
            request = request.header(name.as_str(), key.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network { url: label.clone(), source: e.without_url() })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { url: label, status });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Parsing { url: label.clone(), source: e.without_url() })?;

        if let Some(message) = provider_errors(&body) {
            return Err(ApiError::Provider { url: label, message });
        }
        Ok(body)
    }
}
