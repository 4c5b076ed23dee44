//! Router assembly for the signaling HTTP/WS surface (§6.4), split out of
//! `main.rs` so integration tests can build the same [`axum::Router`] the
//! binary serves without going through a real TCP listener.

use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use filedrop_gateway::{GatewayState, connection};
use filedrop_types::RuntimeConfig;

#[derive(Clone)]
pub struct AppState {
    pub gateway: GatewayState,
    pub runtime_config: Arc<RuntimeConfig>,
}

/// Builds the full router: `/config`, `/healthz`, and the `/ws` signaling
/// upgrade, with CORS and request tracing layered on the way `main.rs` does.
pub fn build_router(gateway: GatewayState, runtime_config: Arc<RuntimeConfig>, cors_origins: &[String]) -> Router {
    let cors = build_cors_layer(cors_origins);

    Router::new()
        .route("/config", get(get_config))
        .route("/healthz", get(healthz).head(healthz))
        .route("/ws", get(ws_upgrade))
        .with_state(AppState { gateway, runtime_config })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json((*state.runtime_config).clone())
}

async fn healthz() -> impl IntoResponse {
    ([(axum::http::header::CACHE_CONTROL, HeaderValue::from_static("no-store"))], "ok")
}

/// §6.1 signaling upgrade. Frame limits sized for the largest wire frame
/// (`FileMetadata` JSON plus `[le_u32 CRC32][payload]` binary frames up to
/// `maxChunkSize`).
async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.max_frame_size(4 * 1024 * 1024)
        .max_message_size(8 * 1024 * 1024)
        .on_upgrade(move |socket| connection::handle_connection(socket, state.gateway))
}

pub fn build_cors_layer(extra_origins: &[String]) -> CorsLayer {
    let mut origins: Vec<HeaderValue> = vec!["http://localhost:5173".parse().unwrap()];
    for origin in extra_origins {
        match origin.parse::<HeaderValue>() {
            Ok(val) => origins.push(val),
            Err(_) => eprintln!("WARNING: ignoring invalid CORS origin: {origin}"),
        }
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::HEAD])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(false)
}
