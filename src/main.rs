mod service;
mod settings;

use crate::service::messages::{Envelope, Request, Response};
use crate::service::refresher::CacheWarmer;
use crate::service::worker::{FinderHandle, FinderWorker};
use crate::settings::Settings;
use anyhow::Context;
use barwatch_api::store::{MemoryStore, Snapshot};
use barwatch_api::{ScreeningFinder, SearchQuery, SportsClient};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "barwatch", version, about = "Find games and the bars screening them")]
struct Cli {
    /// Overrides the configured log level (RUST_LOG wins over both).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search upcoming games for a sport.
    Search {
        #[arg(long)]
        sport: String,
        #[arg(long)]
        team: Option<String>,
        #[arg(long)]
        league: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
    },
    /// Look up a single game.
    Game {
        id: String,
        #[arg(long)]
        sport: Option<String>,
    },
    /// Bars showing a game, nearest first when a location is given.
    Bars {
        game_id: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<f64>,
        /// Kilometres.
        #[arg(long)]
        radius: Option<f64>,
    },
    /// Stored screenings joined with game details.
    Screenings {
        #[command(subcommand)]
        view: ScreeningView,
    },
    /// Answer JSON requests line by line on stdin/stdout.
    Serve,
}

#[derive(Debug, Subcommand)]
enum ScreeningView {
    All,
    Upcoming,
    Bar { id: i64 },
    Game { id: String },
}

impl Command {
    fn into_request(self) -> Option<Request> {
        let request = match self {
            Command::Search { sport, team, league, date } => {
                Request::SearchGames { query: SearchQuery { sport, team, league, date } }
            }
            Command::Game { id, sport } => Request::GameDetails { game_id: id, sport },
            Command::Bars { game_id, lat, lon, radius } => {
                Request::BarsForGame { game_id, lat, lon, radius_km: radius }
            }
            Command::Screenings { view } => match view {
                ScreeningView::All => Request::AllScreenings,
                ScreeningView::Upcoming => Request::UpcomingScreenings { after: None },
                ScreeningView::Bar { id } => Request::ScreeningsForBar { bar_id: id },
                ScreeningView::Game { id } => Request::ScreeningsForGame { game_id: id },
            },
            Command::Serve => return None,
        };
        Some(request)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    better_panic::install();

    let cli = Cli::parse();
    let settings = Settings::load()?;
    init_logging(cli.log_level.as_deref().unwrap_or(&settings.log_level));

    if !settings.has_api_key() {
        warn!("no api_key configured; upstream requests will be unauthenticated");
    }

    let finder = build_finder(&settings)?;
    let (request_tx, request_rx) = mpsc::channel::<Envelope>(100);
    let worker_task = tokio::spawn(FinderWorker::new(Arc::new(finder), request_rx).run());
    let handle = FinderHandle::new(request_tx);

    let result = match cli.command.into_request() {
        Some(request) => one_shot(&handle, request).await,
        None => {
            let warmer_task = settings
                .warm_interval()
                .filter(|_| !settings.warm_sports.is_empty())
                .map(|every| {
                    info!("warming {:?} every {}s", settings.warm_sports, every.as_secs());
                    tokio::spawn(CacheWarmer::new(handle.clone(), settings.warm_sports.clone(), every).run())
                });
            let served = serve(&handle).await;
            if let Some(task) = warmer_task {
                task.abort();
            }
            served
        }
    };

    worker_task.abort();
    result
}

fn init_logging(level: &str) {
    // stdout carries JSON output; logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn build_finder(settings: &Settings) -> anyhow::Result<ScreeningFinder> {
    let client = SportsClient::new(settings.api_key.clone(), settings.request_timeout());
    let mut finder =
        ScreeningFinder::new(client, settings.registry()?).with_config(settings.finder_config());

    match &settings.snapshot_path {
        Some(path) => {
            let snapshot = Snapshot::load(path).context("loading screening snapshot")?;
            info!(
                "loaded {} bars and {} screenings from {}",
                snapshot.bars.len(),
                snapshot.screenings.len(),
                path.display()
            );
            finder = finder.with_store(Arc::new(MemoryStore::from_snapshot(snapshot)));
        }
        None => warn!("no snapshot_path configured; screening views are unavailable"),
    }
    Ok(finder)
}

async fn one_shot(handle: &FinderHandle, request: Request) -> anyhow::Result<()> {
    let response = handle.call(request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    match response {
        Response::Ok { .. } => Ok(()),
        Response::NotFound { message } | Response::Error { message } => anyhow::bail!(message),
    }
}

async fn serve(handle: &FinderHandle) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    info!("serving requests on stdin");

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => handle.call(request).await?,
            Err(e) => {
                warn!("malformed request: {e}");
                Response::error("Malformed request.")
            }
        };
        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}
