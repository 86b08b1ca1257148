use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use dotlife::config::Params;
use dotlife::error::SimError;
use dotlife::point::Point;
use dotlife::render;
use dotlife::rules::RuleKind;
use dotlife::{Input, Sim};

/// Input is polled at ~60 frames per second; the rule runs every `tick_frames` frames.
const FRAME: Duration = Duration::from_millis(16);

struct AppState {
    sim: Mutex<Sim>,
    pending: Mutex<Input>,
}

type Shared = Arc<AppState>;

struct ApiError(StatusCode, String);

impl From<SimError> for ApiError {
    fn from(err: SimError) -> Self {
        let status = match err {
            SimError::Grid(_) => StatusCode::CONFLICT,
            SimError::Step(_) | SimError::Config(_) => StatusCode::BAD_REQUEST,
        };
        ApiError(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum Button {
    Left,
    Right,
}

/// Mouse click in canvas pixels.
#[derive(Deserialize)]
struct ClickRequest {
    x: i32,
    y: i32,
    button: Button,
}

#[derive(Deserialize)]
struct KeyRequest {
    key: String,
}

#[derive(Deserialize)]
struct RuleRequest {
    rule: String,
}

#[derive(Deserialize)]
struct SeedRequest {
    count: Option<usize>,
}

#[derive(Serialize)]
struct StateResponse {
    generation: u64,
    live: usize,
    paused: bool,
    rule: String,
    width: usize,
    height: usize,
    cell_size: u32,
    data_url: String,
}

fn encode_png(rgba: &[u8], w: u32, h: u32) -> String {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new(&mut buf);
    encoder
        .write_image(rgba, w, h, image::ExtendedColorType::Rgba8)
        .expect("PNG encode failed");
    let b64 = base64::engine::general_purpose::STANDARD.encode(&buf);
    format!("data:image/png;base64,{}", b64)
}

fn snapshot(sim: &Sim) -> StateResponse {
    let cell_size = sim.params().cell_size;
    let (w, h) = sim.grid().bounds();
    let rgba = render::render_frame(sim, cell_size);
    StateResponse {
        generation: sim.generation(),
        live: sim.grid().live_count(),
        paused: sim.paused(),
        rule: sim.rule_name(),
        width: w,
        height: h,
        cell_size,
        data_url: encode_png(&rgba, w as u32 * cell_size, h as u32 * cell_size),
    }
}

async fn state_handler(State(state): State<Shared>) -> Json<StateResponse> {
    let response = tokio::task::spawn_blocking(move || {
        let sim = state.sim.lock().expect("sim lock poisoned");
        snapshot(&sim)
    })
    .await
    .expect("render task panicked");
    Json(response)
}

/// Clicks are queued and applied on the next frame, like a polled mouse.
async fn click_handler(State(state): State<Shared>, Json(req): Json<ClickRequest>) -> StatusCode {
    let cell_size = state.sim.lock().expect("sim lock poisoned").params().cell_size;
    let p = Point::from_pixel(req.x, req.y, cell_size);
    let mut pending = state.pending.lock().expect("input lock poisoned");
    match req.button {
        Button::Left => pending.place = Some(p),
        Button::Right => pending.erase = Some(p),
    }
    StatusCode::ACCEPTED
}

async fn key_handler(
    State(state): State<Shared>,
    Json(req): Json<KeyRequest>,
) -> Result<StatusCode, ApiError> {
    let mut pending = state.pending.lock().expect("input lock poisoned");
    match req.key.to_ascii_lowercase().as_str() {
        "space" | " " => pending.toggle_pause = true,
        "c" => pending.restart = true,
        other => {
            return Err(ApiError(
                StatusCode::BAD_REQUEST,
                format!("unbound key '{}'", other),
            ));
        }
    }
    Ok(StatusCode::ACCEPTED)
}

async fn rule_handler(
    State(state): State<Shared>,
    Json(req): Json<RuleRequest>,
) -> Result<StatusCode, ApiError> {
    let kind: RuleKind = req.rule.parse().map_err(SimError::from)?;
    let mut sim = state.sim.lock().expect("sim lock poisoned");
    sim.set_rule(kind.build()).map_err(SimError::from)?;
    Ok(StatusCode::OK)
}

async fn tick_handler(State(state): State<Shared>) -> Result<Json<StateResponse>, ApiError> {
    let mut sim = state.sim.lock().expect("sim lock poisoned");
    sim.tick().map_err(SimError::from)?;
    Ok(Json(snapshot(&sim)))
}

async fn scatter_handler(State(state): State<Shared>) -> Json<serde_json::Value> {
    let moved = state.sim.lock().expect("sim lock poisoned").scatter();
    Json(serde_json::json!({ "moved": moved }))
}

async fn seed_handler(
    State(state): State<Shared>,
    Json(req): Json<SeedRequest>,
) -> Result<StatusCode, ApiError> {
    let mut sim = state.sim.lock().expect("sim lock poisoned");
    let count = req.count.unwrap_or(sim.params().initial_dots.max(1));
    sim.seed_random(count).map_err(SimError::from)?;
    Ok(StatusCode::OK)
}

/// Fixed-rate frame loop: drain queued input, maybe run a generation.
async fn frame_loop(state: Shared) {
    let mut interval = tokio::time::interval(FRAME);
    loop {
        interval.tick().await;
        let input = std::mem::take(&mut *state.pending.lock().expect("input lock poisoned"));
        let mut sim = state.sim.lock().expect("sim lock poisoned");
        if let Err(err) = sim.update(&input) {
            error!(%err, "generation aborted");
            sim.pause();
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let params = match std::env::args().nth(1) {
        Some(path) => Params::from_json_file(&path).unwrap_or_else(|err| {
            warn!(%err, "falling back to default params");
            Params::default()
        }),
        None => Params::default(),
    };
    let sim = Sim::new(params).expect("params are validated on load");

    let state: Shared = Arc::new(AppState {
        sim: Mutex::new(sim),
        pending: Mutex::new(Input::default()),
    });
    tokio::spawn(frame_loop(state.clone()));

    let frontend = ServeDir::new("frontend");

    let app = Router::new()
        .route("/api/state", get(state_handler))
        .route("/api/click", post(click_handler))
        .route("/api/key", post(key_handler))
        .route("/api/rule", post(rule_handler))
        .route("/api/tick", post(tick_handler))
        .route("/api/scatter", post(scatter_handler))
        .route("/api/seed", post(seed_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
        .fallback_service(frontend);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("dotlife server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
