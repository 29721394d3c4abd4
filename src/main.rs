mod config;
mod directions;
mod playback;
mod predictions;
mod proximity;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::directions::DirectionsClient;
use crate::playback::{PlaybackState, RoutePlayback, StepEvent};
use crate::predictions::PredictionClient;
use crate::proximity::{AccidentPoint, GeoPoint};

// Shared state for concurrency
struct AppState {
    config: AppConfig,
    directions: DirectionsClient,
    predictions: PredictionClient,
    playback: Mutex<RoutePlayback>,
    last_step: Arc<Mutex<Option<StepEvent>>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("riskroute=info")),
        )
        .init();

    // 1. Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "riskroute.json".to_string());
    let config = AppConfig::load_or_default(Path::new(&config_path))?;

    // 2. Upstream clients
    let directions = DirectionsClient::new(&config.directions_url);
    let predictions = PredictionClient::new(&config.predictions_url);

    // 3. Playback driver
    let playback = Mutex::new(RoutePlayback::new(config.playback()));

    let bind_addr = config.bind_addr.clone();
    let shared_state = Arc::new(AppState {
        config,
        directions,
        predictions,
        playback,
        last_step: Arc::new(Mutex::new(None)),
    });

    // 4. Setup CORS (allows a local map page to talk to this API)
    let cors = CorsLayer::new()
        .allow_methods(tower_http::cors::Any)
        .allow_origin(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    // 5. Setup Router
    let app = router(shared_state).layer(cors);

    info!("🚀 riskroute API running on http://{}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/simulate", post(start_simulation))
        .route("/simulate/demo", post(start_demo_simulation))
        .route("/simulate/position", get(current_position))
        .route("/simulate/stop", post(stop_simulation))
        .with_state(state)
}

// --- API DTOs ---

#[derive(Deserialize)]
struct SimulateRequest {
    start_location: String,
    end_location: String,
}

#[derive(Debug, Serialize)]
struct SimulateResponse {
    steps: usize,
    route_miles: f64,
    accident_zones: usize,
}

#[derive(Serialize)]
struct PositionResponse {
    running: bool,
    step: Option<usize>,
    position: Option<GeoPoint>,
    alert: bool,
}

// --- Handlers ---

async fn start_simulation(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SimulateRequest>,
) -> Result<Json<SimulateResponse>, (StatusCode, String)> {
    run_simulation(&state, &payload.start_location, &payload.end_location).await
}

/// The "test button": same flow with a configured location pair.
async fn start_demo_simulation(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SimulateResponse>, (StatusCode, String)> {
    let start = state.config.demo_start_location.clone();
    let end = state.config.demo_end_location.clone();
    run_simulation(&state, &start, &end).await
}

async fn run_simulation(
    state: &AppState,
    start_location: &str,
    end_location: &str,
) -> Result<Json<SimulateResponse>, (StatusCode, String)> {
    // Back to a clean slate before touching upstreams, so a failed
    // lookup can't leave a half-stale simulation behind.
    state.playback.lock().unwrap().stop();
    *state.last_step.lock().unwrap() = None;

    let route = state
        .directions
        .route(start_location, end_location)
        .await
        .map_err(|e| {
            error!("directions lookup failed: {e}");
            (
                StatusCode::BAD_GATEWAY,
                format!("directions lookup failed: {e}"),
            )
        })?;

    // Prediction failures are tolerated: simulate without zones.
    let accident_points = match state
        .predictions
        .accident_locations(start_location, end_location)
        .await
    {
        Ok(points) => points,
        Err(e) => {
            warn!("prediction fetch failed, simulating without accident zones: {e}");
            Vec::new()
        }
    };

    let accident_zones = accident_points.iter().filter(|p| p.is_accident).count();
    let accident_points: Arc<[AccidentPoint]> = accident_points.into();
    let steps = route.points.len();
    info!(
        "simulating {} -> {}: {} steps over {:.2} miles, {} predicted accident zones",
        start_location, end_location, steps, route.miles, accident_zones
    );

    let last_step = state.last_step.clone();
    state
        .playback
        .lock()
        .unwrap()
        .start(route.points, accident_points, move |event| {
            if event.is_alert {
                warn!(
                    "step {}: ({}, {}) inside a predicted accident zone",
                    event.index, event.point.lat, event.point.lng
                );
            } else {
                debug!(
                    "step {}: ({}, {})",
                    event.index, event.point.lat, event.point.lng
                );
            }
            *last_step.lock().unwrap() = Some(event);
        });

    Ok(Json(SimulateResponse {
        steps,
        route_miles: route.miles,
        accident_zones,
    }))
}

async fn current_position(State(state): State<Arc<AppState>>) -> Json<PositionResponse> {
    let running = state.playback.lock().unwrap().state() == PlaybackState::Running;
    let last = *state.last_step.lock().unwrap();
    Json(PositionResponse {
        running,
        step: last.map(|e| e.index),
        position: last.map(|e| e.point),
        alert: last.is_some_and(|e| e.is_alert),
    })
}

async fn stop_simulation(State(state): State<Arc<AppState>>) -> StatusCode {
    state.playback.lock().unwrap().stop();
    *state.last_step.lock().unwrap() = None;
    info!("simulation stopped");
    StatusCode::NO_CONTENT
}
