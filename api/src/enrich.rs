//! Joins stored screenings with upstream game details.

use crate::{Enriched, Game, GameSlot, ScreeningLike};
use futures_util::future::join_all;
use log::warn;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::future::Future;

/// Attach a game to every screening.
///
/// Each distinct game id is looked up once, concurrently. A lookup that fails
/// or finds nothing gives a placeholder for that id only, as does a screening
/// without any game id. Output order matches input order.
pub async fn enrich<S, F, Fut, E>(screenings: Vec<S>, fetch_detail: F) -> Vec<Enriched<S>>
where
    S: ScreeningLike,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Option<Game>, E>>,
    E: Display,
{
    let ids = distinct_ids(&screenings);
    let lookups = join_all(ids.iter().map(|id| fetch_detail(id.clone()))).await;

    let mut resolved: HashMap<String, Game> = HashMap::with_capacity(ids.len());
    for (id, result) in ids.into_iter().zip(lookups) {
        match result {
            Ok(Some(game)) => {
                resolved.insert(id, game);
            }
            Ok(None) => warn!("no details found for game {id}"),
            Err(e) => warn!("detail lookup for game {id} failed: {e}"),
        }
    }

    screenings
        .into_iter()
        .map(|screening| {
            let game = match screening.external_game_id() {
                Some(id) => resolved
                    .get(id)
                    .cloned()
                    .map(GameSlot::Resolved)
                    .unwrap_or_else(|| GameSlot::unavailable(Some(id))),
                None => GameSlot::unavailable(None),
            };
            Enriched { screening, game }
        })
        .collect()
}

/// Non-blank game ids in order of first appearance.
fn distinct_ids<S: ScreeningLike>(screenings: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    screenings
        .iter()
        .filter_map(ScreeningLike::external_game_id)
        .filter(|id| !id.trim().is_empty())
        .filter(|id| seen.insert(*id))
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DETAILS_NOT_AVAILABLE;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        label: &'static str,
        game_id: Option<&'static str>,
    }

    impl ScreeningLike for Row {
        fn external_game_id(&self) -> Option<&str> {
            self.game_id
        }
    }

    fn row(label: &'static str, game_id: Option<&'static str>) -> Row {
        Row { label, game_id }
    }

    fn game(id: &str) -> Game {
        Game {
            id: id.into(),
            sport: "Soccer".into(),
            league: "Premier League".into(),
            home_team: "Arsenal".into(),
            away_team: "Chelsea".into(),
            start_time: None,
            status: "Scheduled".into(),
            venue: None,
            api_source: "api-football".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_ids_are_fetched_once_and_failures_become_placeholders() {
        let calls = AtomicUsize::new(0);
        let screenings = vec![row("a", Some("x")), row("b", Some("x")), row("c", Some("y"))];

        let enriched = enrich(screenings, |id| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if id == "y" {
                    Err("upstream timed out")
                } else {
                    Ok(Some(game(&id)))
                }
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(enriched.len(), 3);
        assert_eq!(enriched[0].game.game().map(|g| g.id.as_str()), Some("x"));
        assert_eq!(enriched[1].game.game().map(|g| g.id.as_str()), Some("x"));
        assert_eq!(
            enriched[2].game,
            GameSlot::Unavailable { id: Some("y".into()), error: DETAILS_NOT_AVAILABLE.into() }
        );
    }

    #[tokio::test]
    async fn order_is_preserved_and_missing_ids_get_placeholders() {
        let screenings = vec![
            row("first", Some("b")),
            row("second", None),
            row("third", Some("a")),
            row("fourth", Some("gone")),
        ];

        let enriched = enrich(screenings.clone(), |id| async move {
            Ok::<_, String>((id != "gone").then(|| game(&id)))
        })
        .await;

        let labels: Vec<&str> = enriched.iter().map(|e| e.screening.label).collect();
        assert_eq!(labels, vec!["first", "second", "third", "fourth"]);
        assert!(enriched[0].game.game().is_some());
        assert_eq!(enriched[1].game, GameSlot::unavailable(None));
        assert!(enriched[2].game.game().is_some());
        assert_eq!(enriched[3].game, GameSlot::unavailable(Some("gone")));
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let calls = AtomicUsize::new(0);
        let enriched = enrich(Vec::<Row>::new(), |id| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, String>(Some(game(&id))) }
        })
        .await;
        assert!(enriched.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn placeholder_serializes_with_id_and_error() {
        let json = serde_json::to_value(GameSlot::unavailable(Some("y"))).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "y", "error": DETAILS_NOT_AVAILABLE }));
    }
}
