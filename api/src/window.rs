//! Multi-day fan-out: one upstream request per calendar day, merged in date
//! order and cached as a single window.

use crate::cache::{CacheKey, Payload, ResultCache};
use crate::client::{ApiError, ApiResult, SportsClient};
use crate::registry::SportConfig;
use chrono::{Days, NaiveDate};
use futures_util::future::join_all;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Consecutive days starting at `start`. `days` below 1 is treated as 1.
pub fn window_dates(start: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..u64::from(days.max(1)))
        .filter_map(|offset| start.checked_add_days(Days::new(offset)))
        .collect()
}

/// Whether `date` falls inside the window beginning at `start`.
pub fn covers(start: NaiveDate, days: u32, date: NaiveDate) -> bool {
    window_dates(start, days).contains(&date)
}

/// Raw events for `days` consecutive days from `start`.
///
/// A valid cached window is returned without any upstream call. On a miss,
/// every date is requested concurrently; a date that fails is logged and
/// contributes nothing. Only when every date fails is the call an error, and
/// then nothing is cached.
pub async fn fetch_window(
    client: &SportsClient,
    sport: &SportConfig,
    cache: &dyn ResultCache,
    ttl: Duration,
    start: NaiveDate,
    days: u32,
) -> ApiResult<Payload> {
    let days = days.max(1);
    let key = CacheKey::new(sport.sport_key.clone(), start, days);

    match cache.get(&key).await {
        Ok(Some(hit)) => {
            debug!("cache hit for {} from {start} ({days}d)", sport.sport_key);
            return Ok(hit);
        }
        Ok(None) => {}
        Err(e) => warn!("cache read failed for {}: {e}; fetching upstream", sport.sport_key),
    }

    let dates = window_dates(start, days);
    let results = join_all(dates.iter().map(|date| client.fetch_day(sport, *date))).await;

    let mut events = Vec::new();
    let mut failures = 0;
    for (date, result) in dates.iter().zip(results) {
        match result {
            Ok(day) => events.extend(day),
            Err(e) => {
                failures += 1;
                warn!("{} fetch for {date} failed: {e}", sport.sport_key);
            }
        }
    }

    if failures == dates.len() {
        return Err(ApiError::UpstreamExhausted {
            sport: sport.sport_key.clone(),
            attempts: failures,
        });
    }

    info!(
        "fetched {} {} events over {} day(s) from {start} ({failures} failed)",
        events.len(),
        sport.sport_key,
        dates.len()
    );

    let payload: Payload = Arc::new(events);
    if let Err(e) = cache.set(key, Arc::clone(&payload), ttl).await {
        warn!("cache write failed for {}: {e}", sport.sport_key);
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, MemoryCache, DEFAULT_TTL};
    use crate::registry::SportRegistry;
    use async_trait::async_trait;
    use mockito::Matcher;
    use serde_json::{json, Value};
    use std::io::Write;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn body(ids: &[i64]) -> String {
        let events: Vec<Value> = ids.iter().map(|id| json!({ "fixture": { "id": id } })).collect();
        json!({ "response": events }).to_string()
    }

    async fn mock_day(server: &mut mockito::ServerGuard, date: &str, status: usize, ids: &[i64]) -> mockito::Mock {
        server
            .mock("GET", "/fixtures")
            .match_query(Matcher::UrlEncoded("date".into(), date.into()))
            .with_status(status)
            .with_body(body(ids))
            .expect(1)
            .create_async()
            .await
    }

    #[test]
    fn window_dates_are_consecutive_and_at_least_one() {
        assert_eq!(
            window_dates(day("2024-02-28"), 3),
            vec![day("2024-02-28"), day("2024-02-29"), day("2024-03-01")]
        );
        assert_eq!(window_dates(day("2024-05-01"), 0), vec![day("2024-05-01")]);
        assert!(covers(day("2024-05-01"), 3, day("2024-05-03")));
        assert!(!covers(day("2024-05-01"), 3, day("2024-05-04")));
        assert!(!covers(day("2024-05-01"), 3, day("2024-04-30")));
    }

    #[tokio::test]
    async fn merges_days_in_order_and_tolerates_one_failure() {
        let mut server = mockito::Server::new_async().await;
        let d1 = mock_day(&mut server, "2024-05-01", 200, &[1, 2]).await;
        let d2 = mock_day(&mut server, "2024-05-02", 500, &[]).await;
        let d3 = mock_day(&mut server, "2024-05-03", 200, &[3]).await;

        let registry = SportRegistry::default().with_base_for_all(&server.url());
        let cache = MemoryCache::new();
        let events = fetch_window(
            &SportsClient::default(),
            registry.resolve("soccer").unwrap(),
            &cache,
            DEFAULT_TTL,
            day("2024-05-01"),
            3,
        )
        .await
        .unwrap();

        let ids: Vec<i64> = events.iter().map(|e| e["fixture"]["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(cache.len().await, 1);
        d1.assert_async().await;
        d2.assert_async().await;
        d3.assert_async().await;
    }

    #[tokio::test]
    async fn a_slow_day_times_out_without_holding_up_the_others() {
        let mut server = mockito::Server::new_async().await;
        let _d1 = mock_day(&mut server, "2024-05-01", 200, &[1]).await;
        let _slow = server
            .mock("GET", "/fixtures")
            .match_query(Matcher::UrlEncoded("date".into(), "2024-05-02".into()))
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_millis(1500));
                w.write_all(body(&[2]).as_bytes())
            })
            .create_async()
            .await;
        let _d3 = mock_day(&mut server, "2024-05-03", 200, &[3]).await;

        let registry = SportRegistry::default().with_base_for_all(&server.url());
        let cache = MemoryCache::new();
        let client = SportsClient::new(None, Duration::from_millis(300));
        let started = std::time::Instant::now();
        let events = fetch_window(
            &client,
            registry.resolve("soccer").unwrap(),
            &cache,
            DEFAULT_TTL,
            day("2024-05-01"),
            3,
        )
        .await
        .unwrap();

        let ids: Vec<i64> = events.iter().map(|e| e["fixture"]["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(started.elapsed() < Duration::from_millis(1500));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn all_days_failing_is_an_error_and_nothing_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let _d1 = mock_day(&mut server, "2024-05-01", 502, &[]).await;
        let _d2 = mock_day(&mut server, "2024-05-02", 500, &[]).await;

        let registry = SportRegistry::default().with_base_for_all(&server.url());
        let cache = MemoryCache::new();
        let err = fetch_window(
            &SportsClient::default(),
            registry.resolve("soccer").unwrap(),
            &cache,
            DEFAULT_TTL,
            day("2024-05-01"),
            2,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ApiError::UpstreamExhausted { attempts: 2, .. }));
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn cached_window_skips_upstream() {
        let mut server = mockito::Server::new_async().await;
        let untouched = server
            .mock("GET", "/fixtures")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let registry = SportRegistry::default().with_base_for_all(&server.url());
        let cache = MemoryCache::new();
        let key = CacheKey::new("soccer", day("2024-05-01"), 3);
        cache.set(key, Arc::new(vec![json!({ "cached": true })]), DEFAULT_TTL).await.unwrap();

        let events = fetch_window(
            &SportsClient::default(),
            registry.resolve("soccer").unwrap(),
            &cache,
            DEFAULT_TTL,
            day("2024-05-01"),
            3,
        )
        .await
        .unwrap();

        assert_eq!(events.len(), 1);
        untouched.assert_async().await;
    }

    #[tokio::test]
    async fn empty_days_are_cached_too() {
        let mut server = mockito::Server::new_async().await;
        let only = mock_day(&mut server, "2024-05-01", 200, &[]).await;

        let registry = SportRegistry::default().with_base_for_all(&server.url());
        let soccer = registry.resolve("soccer").unwrap();
        let cache = MemoryCache::new();
        let client = SportsClient::default();

        for _ in 0..2 {
            let events = fetch_window(&client, soccer, &cache, DEFAULT_TTL, day("2024-05-01"), 1)
                .await
                .unwrap();
            assert!(events.is_empty());
        }
        // expect(1): the second call was served from cache.
        only.assert_async().await;
    }

    struct BrokenCache;

    #[async_trait]
    impl ResultCache for BrokenCache {
        async fn get(&self, _key: &CacheKey) -> Result<Option<Payload>, CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }

        async fn set(&self, _key: CacheKey, _payload: Payload, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn cache_failures_fall_through_to_upstream() {
        let mut server = mockito::Server::new_async().await;
        let _d1 = mock_day(&mut server, "2024-05-01", 200, &[9]).await;

        let registry = SportRegistry::default().with_base_for_all(&server.url());
        let events = fetch_window(
            &SportsClient::default(),
            registry.resolve("soccer").unwrap(),
            &BrokenCache,
            DEFAULT_TTL,
            day("2024-05-01"),
            1,
        )
        .await
        .unwrap();
        assert_eq!(events.len(), 1);
    }
}
