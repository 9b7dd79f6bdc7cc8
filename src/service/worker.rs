use crate::service::messages::{Data, Envelope, Request, Response};
use anyhow::Context;
use barwatch_api::{ApiError, ScreeningFinder};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

/// Owns the finder and answers requests. Each request runs on its own task so
/// a slow upstream call never holds up the queue.
pub struct FinderWorker {
    finder: Arc<ScreeningFinder>,
    requests: mpsc::Receiver<Envelope>,
}

impl FinderWorker {
    pub fn new(finder: Arc<ScreeningFinder>, requests: mpsc::Receiver<Envelope>) -> Self {
        Self { finder, requests }
    }

    pub async fn run(mut self) {
        while let Some(Envelope { request, reply }) = self.requests.recv().await {
            let finder = Arc::clone(&self.finder);
            tokio::spawn(async move {
                let label = request.label();
                let response = handle(&finder, request).await;
                debug!("{label} complete");
                if reply.send(response).is_err() {
                    debug!("requester for {label} went away");
                }
            });
        }
    }
}

/// Sending side used by the CLI, the stdio loop and the cache warmer.
#[derive(Debug, Clone)]
pub struct FinderHandle {
    requests: mpsc::Sender<Envelope>,
}

impl FinderHandle {
    pub fn new(requests: mpsc::Sender<Envelope>) -> Self {
        Self { requests }
    }

    pub async fn call(&self, request: Request) -> anyhow::Result<Response> {
        let (reply, answer) = oneshot::channel();
        self.requests
            .send(Envelope { request, reply })
            .await
            .context("finder worker stopped")?;
        answer.await.context("finder worker dropped the request")
    }
}

pub async fn handle(finder: &ScreeningFinder, request: Request) -> Response {
    let label = request.label();
    let result = match request {
        Request::SearchGames { query } => finder.search_games(&query).await.map(|g| Some(Data::Games(g))),
        Request::GameDetails { game_id, sport } => {
            let game = match sport {
                Some(sport) => finder.game_details_in(&sport, &game_id).await,
                None => finder.game_details(&game_id).await,
            };
            game.map(|g| g.map(Data::Game))
        }
        Request::BarsForGame { game_id, lat, lon, radius_km } => finder
            .bars_for_game(&game_id, lat, lon, radius_km)
            .await
            .map(|b| Some(Data::Bars(b))),
        Request::AllScreenings => finder.all_screenings().await.map(|s| Some(Data::Screenings(s))),
        Request::UpcomingScreenings { after } => finder
            .upcoming_screenings(after.unwrap_or_else(Utc::now))
            .await
            .map(|s| Some(Data::Screenings(s))),
        Request::ScreeningsForBar { bar_id } => finder
            .screenings_for_bar(bar_id)
            .await
            .map(|s| Some(Data::Screenings(s))),
        Request::ScreeningsForGame { game_id } => finder
            .screenings_for_game(&game_id)
            .await
            .map(|g| g.map(Data::GameScreenings)),
        Request::Warm { sport } => finder
            .warm(&sport)
            .await
            .map(|events| Some(Data::Warmed { sport, events })),
    };

    match result {
        Ok(Some(data)) => Response::ok(data),
        Ok(None) => Response::NotFound { message: "Game not found.".into() },
        Err(e) => {
            log_failure(label, &e);
            Response::error(e.user_message())
        }
    }
}

fn log_failure(label: &str, e: &ApiError) {
    if e.is_validation() {
        warn!("{label} rejected: {e}");
    } else {
        error!("{label} failed: {e}");
    }
}
