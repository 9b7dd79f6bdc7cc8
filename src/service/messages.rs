use barwatch_api::{BarWithDistance, Enriched, Game, GameScreenings, Screening, SearchQuery};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// One finder operation. Also the wire format of `serve` (`{"op": ...}`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    SearchGames {
        #[serde(flatten)]
        query: SearchQuery,
    },
    GameDetails {
        game_id: String,
        #[serde(default)]
        sport: Option<String>,
    },
    BarsForGame {
        game_id: String,
        #[serde(default)]
        lat: Option<f64>,
        #[serde(default)]
        lon: Option<f64>,
        #[serde(default)]
        radius_km: Option<f64>,
    },
    AllScreenings,
    UpcomingScreenings {
        /// Defaults to now.
        #[serde(default)]
        after: Option<DateTime<Utc>>,
    },
    ScreeningsForBar {
        bar_id: i64,
    },
    ScreeningsForGame {
        game_id: String,
    },
    Warm {
        sport: String,
    },
}

impl Request {
    pub fn label(&self) -> &'static str {
        match self {
            Request::SearchGames { .. } => "search_games",
            Request::GameDetails { .. } => "game_details",
            Request::BarsForGame { .. } => "bars_for_game",
            Request::AllScreenings => "all_screenings",
            Request::UpcomingScreenings { .. } => "upcoming_screenings",
            Request::ScreeningsForBar { .. } => "screenings_for_bar",
            Request::ScreeningsForGame { .. } => "screenings_for_game",
            Request::Warm { .. } => "warm",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Data {
    Games(Vec<Game>),
    Game(Game),
    Bars(Vec<BarWithDistance>),
    Screenings(Vec<Enriched<Screening>>),
    GameScreenings(GameScreenings),
    Warmed { sport: String, events: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok { data: Data },
    NotFound { message: String },
    Error { message: String },
}

impl Response {
    pub fn ok(data: Data) -> Self {
        Response::Ok { data }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error { message: message.into() }
    }
}

/// A request paired with the channel its answer goes back on.
#[derive(Debug)]
pub struct Envelope {
    pub request: Request,
    pub reply: oneshot::Sender<Response>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_parse_from_op_lines() {
        let search: Request = serde_json::from_str(
            r#"{"op":"search_games","sport":"soccer","team":"arsenal","date":"2024-05-01"}"#,
        )
        .unwrap();
        assert_eq!(
            search,
            Request::SearchGames {
                query: SearchQuery {
                    sport: "soccer".into(),
                    team: Some("arsenal".into()),
                    league: None,
                    date: Some("2024-05-01".into()),
                }
            }
        );

        let bars: Request =
            serde_json::from_str(r#"{"op":"bars_for_game","game_id":"evt123","lat":40.0,"lon":-73.0}"#).unwrap();
        assert_eq!(bars.label(), "bars_for_game");

        let upcoming: Request = serde_json::from_str(r#"{"op":"upcoming_screenings"}"#).unwrap();
        assert_eq!(upcoming, Request::UpcomingScreenings { after: None });

        let all: Request = serde_json::from_str(r#"{"op":"all_screenings"}"#).unwrap();
        assert_eq!(all, Request::AllScreenings);
        assert_eq!(all.label(), "all_screenings");

        assert!(serde_json::from_str::<Request>(r#"{"op":"drop_tables"}"#).is_err());
    }

    #[test]
    fn responses_carry_a_status_tag() {
        let err = serde_json::to_value(Response::error("Error fetching games data.")).unwrap();
        assert_eq!(err, json!({ "status": "error", "message": "Error fetching games data." }));

        let warmed = serde_json::to_value(Response::ok(Data::Warmed { sport: "mma".into(), events: 4 })).unwrap();
        assert_eq!(warmed, json!({ "status": "ok", "data": { "sport": "mma", "events": 4 } }));
    }
}
