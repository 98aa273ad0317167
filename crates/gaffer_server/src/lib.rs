//! HTTP surface over the simulation core.
//!
//! All read endpoints are projections served from a copy-on-write world view
//! behind a reader lock; the single write path (`POST /advance`) goes through
//! the orchestrator under the simulation mutex and refreshes the view. The
//! core is insensitive to this transport: every endpoint is a thin JSON shim
//! over `gaffer_core::query`.

use std::sync::{Arc, Mutex, RwLock};

use rocket::http::Status;
use rocket::response::stream::{Event as SseEvent, EventStream};
use rocket::serde::json::Json;
use rocket::tokio::time::{sleep, Duration};
use rocket::{get, post, routes, Build, Rocket, State};
use serde::Serialize;

use gaffer_core::error::CoreError;
use gaffer_core::models::team::HeadToHead;
use gaffer_core::models::{Event, Team, World};
use gaffer_core::orchestrator::AdvanceSummary;
use gaffer_core::query;
use gaffer_core::SimContext;

/// Shared application state: the orchestrated simulation plus a read view
/// that is swapped wholesale after every write.
pub struct AppState {
    sim: Arc<Mutex<SimContext>>,
    view: Arc<RwLock<World>>,
}

impl AppState {
    pub fn new(ctx: SimContext) -> Self {
        let view = Arc::new(RwLock::new(ctx.world.clone()));
        AppState { sim: Arc::new(Mutex::new(ctx)), view }
    }

    fn world(&self) -> World {
        self.view.read().expect("world view lock").clone()
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiResult<T> = Result<Json<T>, (Status, Json<ErrorBody>)>;

fn api_error(err: CoreError) -> (Status, Json<ErrorBody>) {
    let status = if err.is_not_found() {
        Status::NotFound
    } else if matches!(err, CoreError::CalendarExhausted { .. }) {
        Status::Conflict
    } else {
        Status::InternalServerError
    };
    if status == Status::InternalServerError {
        log::error!("request failed: {}", err);
    }
    (status, Json(ErrorBody { error: err.to_string() }))
}

#[derive(Debug, Serialize)]
struct LeagueSummary {
    id: String,
    name: String,
    current_matchday: u32,
    last_matchday: u32,
}

#[derive(Debug, Serialize)]
struct WorldSummary {
    season: u32,
    current_date: chrono::NaiveDate,
    seed: u64,
    leagues: Vec<LeagueSummary>,
    team_count: usize,
    player_count: usize,
    latest_news: Vec<gaffer_core::models::NewsItem>,
}

#[get("/world")]
fn world(state: &State<AppState>) -> Json<WorldSummary> {
    let world = state.world();
    let leagues = world
        .leagues
        .values()
        .map(|l| LeagueSummary {
            id: l.id.clone(),
            name: l.name.clone(),
            current_matchday: l.current_matchday,
            last_matchday: l.last_matchday(),
        })
        .collect();
    let latest_news = world.news.iter().rev().take(10).cloned().collect();
    Json(WorldSummary {
        season: world.season,
        current_date: world.current_date,
        seed: world.seed,
        leagues,
        team_count: world.teams.len(),
        player_count: world.players.len(),
        latest_news,
    })
}

#[get("/leagues/<id>/table")]
fn league_table(state: &State<AppState>, id: &str) -> ApiResult<Vec<query::TableRow>> {
    query::league_table(&state.world(), id).map(Json).map_err(api_error)
}

#[get("/leagues/<id>/top-scorers?<season>&<limit>")]
fn top_scorers(
    state: &State<AppState>,
    id: &str,
    season: Option<u32>,
    limit: Option<usize>,
) -> ApiResult<Vec<query::PlayerStatRow>> {
    let world = state.world();
    let season = season.unwrap_or(world.season);
    query::top_scorers(&world, id, season, limit.unwrap_or(10))
        .map(Json)
        .map_err(api_error)
}

#[get("/leagues/<id>/best-defense")]
fn best_defense(state: &State<AppState>, id: &str) -> ApiResult<Vec<query::DefenseRow>> {
    query::best_defense(&state.world(), id).map(Json).map_err(api_error)
}

#[get("/teams/<id>")]
fn team(state: &State<AppState>, id: &str) -> ApiResult<Team> {
    state.world().team(id).cloned().map(Json).map_err(api_error)
}

#[get("/teams/<id>/head-to-head")]
fn head_to_head(
    state: &State<AppState>,
    id: &str,
) -> ApiResult<std::collections::BTreeMap<String, HeadToHead>> {
    query::head_to_head(&state.world(), id).map(Json).map_err(api_error)
}

#[get("/players/<id>/season-stats?<season>")]
fn player_season_stats(
    state: &State<AppState>,
    id: &str,
    season: Option<u32>,
) -> ApiResult<gaffer_core::models::player::SeasonStats> {
    let world = state.world();
    let season = season.unwrap_or(world.season);
    query::player_season_stats(&world, id, season).map(Json).map_err(api_error)
}

#[get("/matches/<id>/events")]
fn match_events(state: &State<AppState>, id: &str) -> ApiResult<Vec<Event>> {
    // Existence check against the view, then a log scan under the sim lock.
    state.world().match_record(id).map_err(api_error)?;
    let sim = state.sim.lock().expect("sim lock");
    let events = sim.store.read_from(1).map_err(api_error)?;
    Ok(Json(query::match_events(&events, id)))
}

#[post("/advance")]
async fn advance(state: &State<AppState>) -> ApiResult<AdvanceSummary> {
    let sim = Arc::clone(&state.sim);
    let view = Arc::clone(&state.view);
    let outcome = rocket::tokio::task::spawn_blocking(move || {
        let mut guard = sim.lock().expect("sim lock");
        let outcome = guard.advance();
        if outcome.is_ok() {
            *view.write().expect("world view lock") = guard.world.clone();
        }
        outcome
    })
    .await
    .map_err(|join_err| {
        (
            Status::InternalServerError,
            Json(ErrorBody { error: format!("advance task failed: {}", join_err) }),
        )
    })?;
    outcome.map(Json).map_err(api_error)
}

/// Server-sent replay of the event log from a given sequence; keeps tailing
/// as new matchdays append.
#[get("/events/stream?<from>")]
fn event_stream(state: &State<AppState>, from: Option<i64>) -> EventStream![] {
    let sim = Arc::clone(&state.sim);
    EventStream! {
        let mut cursor = from.unwrap_or(1).max(1);
        loop {
            let batch = {
                let guard = sim.lock().expect("sim lock");
                guard.store.read_from(cursor)
            };
            match batch {
                Ok(events) => {
                    for (sequence, event) in events {
                        cursor = sequence + 1;
                        let body = serde_json::to_string(&event)
                            .unwrap_or_else(|_| "{}".to_string());
                        yield SseEvent::data(body)
                            .event(event.kind().to_string())
                            .id(sequence.to_string());
                    }
                }
                Err(err) => {
                    log::error!("event stream read failed: {}", err);
                    yield SseEvent::data(err.to_string()).event("stream_error");
                    break;
                }
            }
            sleep(Duration::from_millis(1000)).await;
        }
    }
}

pub fn build_rocket(state: AppState) -> Rocket<Build> {
    rocket::build().manage(state).mount(
        "/",
        routes![
            world,
            league_table,
            top_scorers,
            best_defense,
            team,
            head_to_head,
            player_season_stats,
            match_events,
            advance,
            event_stream,
        ],
    )
}

/// Run the server on rocket's own runtime; blocks until shutdown.
pub fn serve(ctx: SimContext) -> Result<(), rocket::Error> {
    rocket::execute(async move {
        build_rocket(AppState::new(ctx)).launch().await.map(|_| ())
    })
}
