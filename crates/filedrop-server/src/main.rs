use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::info;

use filedrop_gateway::{GatewayState, PayloadGuard, RateLimiter, RoomRegistry, run_sweep_loop};
use filedrop_gateway::dispatcher::Dispatcher;
use filedrop_gateway::pending::PendingJoins;
use filedrop_server::build_router;
use filedrop_types::{RuntimeConfig, ServerConfig, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filedrop=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    let runtime_config = RuntimeConfig::default();

    let clock: Arc<dyn filedrop_types::Clock> = Arc::new(SystemClock);
    let registry = RoomRegistry::new(
        config.max_peers_per_room,
        Duration::from_millis(config.room_ttl_ms),
        clock.clone(),
    );
    let state = GatewayState {
        registry: registry.clone(),
        pending: PendingJoins::new(),
        dispatcher: Dispatcher::new(),
        rate_limiter: RateLimiter::new(Duration::from_millis(config.rate_window_ms), config.rate_max, clock),
        payload_guard: PayloadGuard::new(config.max_signal_payload_bytes),
    };

    tokio::spawn(run_sweep_loop(registry, Duration::from_millis(config.sweep_interval_ms)));

    let app = build_router(state, Arc::new(runtime_config), &config.cors_origins);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("filedrop signaling server listening on {}", addr);

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;
    let listener = tokio::net::TcpListener::from_std(socket.into())?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("received Ctrl+C, shutting down"),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received Ctrl+C, shutting down");
    }
}
