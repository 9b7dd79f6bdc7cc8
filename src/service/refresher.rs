use crate::service::messages::{Request, Response};
use crate::service::worker::FinderHandle;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Periodically re-fetches the default window for each configured sport so
/// searches keep hitting a fresh cache after entries expire.
pub struct CacheWarmer {
    finder: FinderHandle,
    sports: Vec<String>,
    every: Duration,
}

impl CacheWarmer {
    pub fn new(finder: FinderHandle, sports: Vec<String>, every: Duration) -> Self {
        Self { finder, sports, every }
    }

    pub async fn run(self) {
        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // First tick fires immediately: warm on startup.
            ticker.tick().await;
            if !self.warm_all().await {
                break;
            }
        }
    }

    /// One pass over every sport. `false` once the worker is gone.
    pub async fn warm_all(&self) -> bool {
        for sport in &self.sports {
            match self.finder.call(Request::Warm { sport: sport.clone() }).await {
                Ok(Response::Ok { .. }) => info!("warmed {sport} window cache"),
                Ok(Response::Error { message } | Response::NotFound { message }) => {
                    warn!("warming {sport} failed: {message}")
                }
                Err(e) => {
                    warn!("cache warmer stopping: {e}");
                    return false;
                }
            }
        }
        true
    }
}
