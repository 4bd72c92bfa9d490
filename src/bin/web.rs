//! Single binary web server: JSON API over the court rotation engine.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default.
//! Override with env: HOST (e.g. 0.0.0.0), PORT (e.g. 8080), DATA_DIR (saved histories).

use actix_web::{
    delete, get, post, put,
    web::{self, Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use court_rotation::{
    parse_roster_csv, set_court_winner, start_round, AlgorithmTag, CancelToken, Court,
    FileStorage, Player, PlayerId, Session, SessionError, SessionId, Team,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Per-session entry: session data + last activity time (for auto-cleanup).
struct SessionEntry {
    session: Session,
    last_activity: Instant,
}

type SharedEntry = Arc<Mutex<SessionEntry>>;

/// In-memory state: many sessions by ID. Entries are removed after 12h inactivity.
///
/// The map lock is only held to find or insert an entry. Each session has its own async
/// lock, so generating a round for one session never holds up requests for another.
type AppState = Data<RwLock<HashMap<SessionId, SharedEntry>>>;

/// Inactivity threshold: sessions not accessed for this long are removed.
const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(12 * 3600);

/// Server settings read from the environment.
#[derive(Clone, Debug)]
struct ServerConfig {
    host: String,
    port: u16,
    data_dir: PathBuf,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
        }
    }

    /// Saved history for one session lives in its own directory.
    fn storage_for(&self, id: SessionId) -> FileStorage {
        FileStorage::new(self.data_dir.join(id.to_string()))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

/// What the client sees of a session.
#[derive(Serialize)]
struct SessionView<'a> {
    id: SessionId,
    algorithm: AlgorithmTag,
    number_of_courts: usize,
    round: u32,
    players: &'a [Player],
    courts: &'a [Court],
    benched: Vec<PlayerId>,
}

impl<'a> SessionView<'a> {
    fn of(s: &'a Session) -> Self {
        Self {
            id: s.id,
            algorithm: s.algorithm,
            number_of_courts: s.number_of_courts,
            round: s.round,
            players: &s.players,
            courts: &s.courts,
            benched: s.benched_players().into_iter().map(|p| p.id).collect(),
        }
    }
}

#[derive(Serialize)]
struct StatsView<'a> {
    wins: &'a HashMap<PlayerId, u32>,
    losses: &'a HashMap<PlayerId, u32>,
    bench: &'a HashMap<PlayerId, u32>,
    benched_players: Vec<Player>,
}

#[derive(Deserialize)]
struct CreateSessionBody {
    #[serde(default)]
    algorithm: AlgorithmTag,
    #[serde(default = "default_courts")]
    number_of_courts: usize,
}

fn default_courts() -> usize {
    2
}

#[derive(Deserialize)]
struct AddPlayerBody {
    name: String,
}

#[derive(Deserialize)]
struct PresenceBody {
    present: bool,
}

#[derive(Deserialize)]
struct CourtsBody {
    number_of_courts: usize,
}

#[derive(Deserialize)]
struct AlgorithmBody {
    algorithm: AlgorithmTag,
}

#[derive(Default, Deserialize)]
struct GenerateRoundBody {
    #[serde(default)]
    manual_selection: Option<Vec<PlayerId>>,
    #[serde(default)]
    force_bench: Vec<PlayerId>,
}

#[derive(Deserialize)]
struct SetWinnerBody {
    court_number: u32,
    winner: Option<Team>,
}

/// Path segment: session id (e.g. /api/sessions/{id})
#[derive(Deserialize)]
struct SessionPath {
    id: SessionId,
}

/// Path segments: session id and player id (e.g. /api/sessions/{id}/players/{player_id})
#[derive(Deserialize)]
struct SessionPlayerPath {
    id: SessionId,
    player_id: PlayerId,
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({ "error": "No session" }))
}

fn bad_request(e: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": e.to_string() }))
}

fn lock_error() -> HttpResponse {
    HttpResponse::InternalServerError().body("lock error")
}

/// Register a new session and hand back its entry.
fn insert_session(state: &AppState, session: Session) -> Option<SharedEntry> {
    let mut g = state.write().ok()?;
    let id = session.id;
    let entry = Arc::new(Mutex::new(SessionEntry {
        session,
        last_activity: Instant::now(),
    }));
    g.insert(id, entry.clone());
    Some(entry)
}

/// Find a session's entry; the map lock is released before returning.
fn lookup(state: &AppState, id: SessionId) -> Result<SharedEntry, HttpResponse> {
    let g = state.read().map_err(|_| lock_error())?;
    g.get(&id).cloned().ok_or_else(not_found)
}

/// Look up a session, refresh its activity time, run `f` on it and answer with the
/// updated session (or the error).
async fn with_session<F>(state: &AppState, id: SessionId, f: F) -> HttpResponse
where
    F: FnOnce(&mut Session) -> Result<(), SessionError>,
{
    let shared = match lookup(state, id) {
        Ok(entry) => entry,
        Err(resp) => return resp,
    };
    let mut entry = shared.lock().await;
    entry.last_activity = Instant::now();
    match f(&mut entry.session) {
        Ok(()) => HttpResponse::Ok().json(SessionView::of(&entry.session)),
        Err(e) => bad_request(e),
    }
}

/// Remove sessions idle for at least `timeout`. Sessions locked by a running request are
/// in use and stay. Returns how many were removed.
fn sweep_inactive(state: &AppState, timeout: Duration) -> usize {
    let Ok(mut g) = state.write() else {
        return 0;
    };
    let before = g.len();
    g.retain(|_, entry| match entry.try_lock() {
        Ok(e) => e.last_activity.elapsed() < timeout,
        Err(_) => true,
    });
    before - g.len()
}

/// Cancels a round search once the request that started it is gone (finished or
/// dropped by a disconnecting client).
struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "court-rotation",
    })
}

/// Create a new session (returns it with id; client stores id for subsequent requests).
#[post("/api/sessions")]
async fn api_create_session(state: AppState, body: Option<Json<CreateSessionBody>>) -> HttpResponse {
    let (algorithm, courts) = body
        .map(|b| (b.algorithm, b.number_of_courts))
        .unwrap_or((AlgorithmTag::default(), default_courts()));
    let session = Session::new(algorithm, courts);
    log::info!(
        "Created session {} ({}, {} court(s))",
        session.id,
        algorithm,
        session.number_of_courts
    );
    let Some(shared) = insert_session(&state, session) else {
        return lock_error();
    };
    let entry = shared.lock().await;
    HttpResponse::Ok().json(SessionView::of(&entry.session))
}

/// Get a session by id (404 if not found). Touching it refreshes last_activity.
#[get("/api/sessions/{id}")]
async fn api_get_session(state: AppState, path: Path<SessionPath>) -> HttpResponse {
    with_session(&state, path.id, |_| Ok(())).await
}

#[post("/api/sessions/{id}/players")]
async fn api_add_player(state: AppState, path: Path<SessionPath>, body: Json<AddPlayerBody>) -> HttpResponse {
    with_session(&state, path.id, |s| s.add_player(body.name.as_str()).map(|_| ())).await
}

/// Import a roster from CSV text (`name[,present]` per line). Duplicate names are skipped.
#[post("/api/sessions/{id}/players/import")]
async fn api_import_players(state: AppState, path: Path<SessionPath>, body: String) -> HttpResponse {
    let players = match parse_roster_csv(&body) {
        Ok(p) => p,
        Err(e) => return bad_request(e),
    };
    with_session(&state, path.id, |s| {
        let added = s.import_players(players);
        log::info!("Session {}: imported {} player(s)", s.id, added);
        Ok(())
    })
    .await
}

#[delete("/api/sessions/{id}/players/{player_id}")]
async fn api_remove_player(state: AppState, path: Path<SessionPlayerPath>) -> HttpResponse {
    with_session(&state, path.id, |s| s.remove_player(path.player_id)).await
}

/// Check a player in or out.
#[put("/api/sessions/{id}/players/{player_id}/presence")]
async fn api_set_presence(
    state: AppState,
    path: Path<SessionPlayerPath>,
    body: Json<PresenceBody>,
) -> HttpResponse {
    with_session(&state, path.id, |s| s.set_presence(path.player_id, body.present)).await
}

#[put("/api/sessions/{id}/courts")]
async fn api_set_courts(state: AppState, path: Path<SessionPath>, body: Json<CourtsBody>) -> HttpResponse {
    with_session(&state, path.id, |s| s.set_number_of_courts(body.number_of_courts)).await
}

/// Switch algorithm; resets the history when the family changes.
#[put("/api/sessions/{id}/algorithm")]
async fn api_set_algorithm(state: AppState, path: Path<SessionPath>, body: Json<AlgorithmBody>) -> HttpResponse {
    with_session(&state, path.id, |s| {
        s.set_algorithm(body.algorithm);
        Ok(())
    })
    .await
}

/// Generate the next round. Runs on the blocking pool: annealing can take thousands of
/// iterations. Only this session is locked meanwhile.
#[post("/api/sessions/{id}/rounds")]
async fn api_generate_round(
    state: AppState,
    path: Path<SessionPath>,
    body: Option<Json<GenerateRoundBody>>,
) -> HttpResponse {
    let body = body.map(Json::into_inner).unwrap_or_default();
    let shared = match lookup(&state, path.id) {
        Ok(entry) => entry,
        Err(resp) => return resp,
    };
    let cancel = CancelToken::new();
    let _cancel_on_drop = CancelOnDrop(cancel.clone());
    let mut entry = shared.lock_owned().await;
    let result = tokio::task::spawn_blocking(move || {
        entry.last_activity = Instant::now();
        let outcome = start_round(
            &mut entry.session,
            body.manual_selection.as_deref(),
            &body.force_bench,
            &mut rand::thread_rng(),
            Some(cancel),
        );
        (entry, outcome)
    })
    .await;
    match result {
        Ok((entry, Ok(()))) => HttpResponse::Ok().json(SessionView::of(&entry.session)),
        Ok((_, Err(e))) => bad_request(e),
        Err(e) => {
            log::warn!("Round generation task failed: {}", e);
            HttpResponse::InternalServerError().body("generation failed")
        }
    }
}

/// Set (or clear with null) the winner of a court in the current round.
#[put("/api/sessions/{id}/rounds/winner")]
async fn api_set_winner(state: AppState, path: Path<SessionPath>, body: Json<SetWinnerBody>) -> HttpResponse {
    with_session(&state, path.id, |s| {
        set_court_winner(s, body.court_number, body.winner).map(|_| ())
    })
    .await
}

#[get("/api/sessions/{id}/stats")]
async fn api_stats(state: AppState, path: Path<SessionPath>) -> HttpResponse {
    let shared = match lookup(&state, path.id) {
        Ok(entry) => entry,
        Err(resp) => return resp,
    };
    let entry = shared.lock().await;
    let s = &entry.session;
    HttpResponse::Ok().json(StatsView {
        wins: s.history.win_counts(),
        losses: s.history.loss_counts(),
        bench: s.history.bench_counts(),
        benched_players: s.benched_players(),
    })
}

#[post("/api/sessions/{id}/history/reset")]
async fn api_reset_history(state: AppState, path: Path<SessionPath>) -> HttpResponse {
    with_session(&state, path.id, |s| {
        s.history.reset_history();
        Ok(())
    })
    .await
}

/// Save the history to DATA_DIR. Storage problems are logged, never returned as errors.
#[post("/api/sessions/{id}/history/save")]
async fn api_save_history(
    state: AppState,
    config: Data<ServerConfig>,
    path: Path<SessionPath>,
) -> HttpResponse {
    let mut storage = config.storage_for(path.id);
    with_session(&state, path.id, |s| {
        let saved = s.save_history(&mut storage);
        log::info!("Session {}: history saved={}", s.id, saved);
        Ok(())
    })
    .await
}

/// Load the saved history for the active algorithm (resets on algorithm mismatch).
#[post("/api/sessions/{id}/history/load")]
async fn api_load_history(
    state: AppState,
    config: Data<ServerConfig>,
    path: Path<SessionPath>,
) -> HttpResponse {
    let storage = config.storage_for(path.id);
    with_session(&state, path.id, |s| {
        let loaded = s.load_history(&storage);
        log::info!("Session {}: history loaded={}", s.id, loaded);
        Ok(())
    })
    .await
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ServerConfig::from_env();
    let bind = (config.host.clone(), config.port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);
    log::info!("Saving histories under {}", config.data_dir.display());

    let state: AppState = Data::new(RwLock::new(HashMap::new()));
    let config = Data::new(config);

    // Background task: every 30 minutes, remove sessions inactive for 12+ hours
    let state_cleanup = state.clone();
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(Duration::from_secs(30 * 60));
        loop {
            interval.tick().await;
            let removed = sweep_inactive(&state_cleanup, INACTIVITY_TIMEOUT);
            if removed > 0 {
                log::info!("Cleaned up {} inactive session(s) (no activity for 12h)", removed);
            }
        }
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(config.clone())
            .app_data(web::PayloadConfig::new(256 * 1024))
            .service(api_health)
            .service(api_create_session)
            .service(api_get_session)
            .service(api_add_player)
            .service(api_import_players)
            .service(api_remove_player)
            .service(api_set_presence)
            .service(api_set_courts)
            .service(api_set_algorithm)
            .service(api_generate_round)
            .service(api_set_winner)
            .service(api_stats)
            .service(api_reset_history)
            .service(api_save_history)
            .service(api_load_history)
    })
    .bind(bind)?
    .run()
    .await
}
