use anyhow::Context;
use barwatch_api::cache::DEFAULT_TTL;
use barwatch_api::finder::DEFAULT_WINDOW_DAYS;
use barwatch_api::geo::DEFAULT_RADIUS_KM;
use barwatch_api::registry::ApiKeyPlacement;
use barwatch_api::{FinderConfig, SportRegistry};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSettings {
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_key: Option<String>,
    /// Send the key as this query parameter instead of the `x-apisports-key` header.
    #[serde(default)]
    pub api_key_param: Option<String>,
    /// JSON `{ bars, screenings }` file backing the screening views.
    pub snapshot_path: Option<PathBuf>,
    pub log_level: String,
    pub window_days: u32,
    pub cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
    pub default_radius_km: f64,
    pub detail_sport: String,
    /// 0 disables the cache warmer.
    pub warm_interval_secs: u64,
    #[serde(default)]
    pub warm_sports: Vec<String>,
    #[serde(default)]
    pub providers: HashMap<String, ProviderSettings>,
}

impl Settings {
    /// Defaults, then `barwatch.toml`, then `BARWATCH_*` variables
    /// (`BARWATCH_PROVIDERS__SOCCER__BASE_URL` for nested keys).
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env is normal.
        let _ = dotenvy::dotenv();

        Config::builder()
            .set_default("log_level", "info")?
            .set_default("window_days", i64::from(DEFAULT_WINDOW_DAYS))?
            .set_default("cache_ttl_secs", DEFAULT_TTL.as_secs() as i64)?
            .set_default("request_timeout_secs", 10_i64)?
            .set_default("default_radius_km", DEFAULT_RADIUS_KM)?
            .set_default("detail_sport", "soccer")?
            .set_default("warm_interval_secs", 0_i64)?
            .add_source(File::with_name("barwatch").required(false))
            .add_source(
                Environment::with_prefix("BARWATCH")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("warm_sports")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn warm_interval(&self) -> Option<Duration> {
        (self.warm_interval_secs > 0).then(|| Duration::from_secs(self.warm_interval_secs))
    }

    pub fn finder_config(&self) -> FinderConfig {
        FinderConfig {
            window_days: self.window_days.max(1),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            default_radius_km: self.default_radius_km,
            detail_sport: self.detail_sport.clone(),
        }
    }

    /// Default registry with the configured key placement and base URL
    /// overrides applied.
    pub fn registry(&self) -> anyhow::Result<SportRegistry> {
        let mut registry = SportRegistry::default();
        if let Some(param) = self.api_key_param.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            registry.set_auth(ApiKeyPlacement::Query(param.to_owned()));
        }
        for (sport, provider) in &self.providers {
            if let Some(base) = &provider.base_url {
                registry
                    .override_base(sport, base.clone())
                    .with_context(|| format!("providers.{sport}.base_url"))?;
            }
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            api_key: None,
            api_key_param: None,
            snapshot_path: None,
            log_level: "info".into(),
            window_days: 0,
            cache_ttl_secs: 60,
            request_timeout_secs: 0,
            default_radius_km: 2.5,
            detail_sport: "basketball".into(),
            warm_interval_secs: 0,
            warm_sports: vec![],
            providers: HashMap::new(),
        }
    }

    #[test]
    fn derived_values_are_clamped() {
        let s = settings();
        assert_eq!(s.request_timeout(), Duration::from_secs(1));
        assert_eq!(s.warm_interval(), None);
        assert!(!s.has_api_key());
        let config = s.finder_config();
        assert_eq!(config.window_days, 1);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.detail_sport, "basketball");
    }

    #[test]
    fn provider_overrides_reach_the_registry() {
        let mut s = settings();
        s.providers.insert(
            "mma".into(),
            ProviderSettings { base_url: Some("http://localhost:9000".into()) },
        );
        let registry = s.registry().unwrap();
        assert_eq!(registry.resolve("mma").unwrap().events_url(), "http://localhost:9000/fights");

        s.providers.insert("curling".into(), ProviderSettings { base_url: Some("http://x".into()) });
        assert!(s.registry().is_err());
    }

    #[test]
    fn api_key_param_moves_the_key_into_the_query() {
        let mut s = settings();
        let registry = s.registry().unwrap();
        assert_eq!(registry.resolve("soccer").unwrap().auth, ApiKeyPlacement::default());

        s.api_key_param = Some("  ".into());
        assert_eq!(s.registry().unwrap().resolve("soccer").unwrap().auth, ApiKeyPlacement::default());

        s.api_key_param = Some("apikey".into());
        let registry = s.registry().unwrap();
        for sport in registry.sport_keys() {
            assert_eq!(registry.resolve(sport).unwrap().auth, ApiKeyPlacement::Query("apikey".into()));
        }
    }
}
