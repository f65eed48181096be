// Framework bootstrap for the game server runtime.

use crate::domain::World;
use crate::frameworks::config;
use crate::interface_adapters::net::ws_handler;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{GameEvent, SimClock, world_task};

use axum::{Router, routing::get};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{broadcast, mpsc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Serves the game on an already bound listener with tuning and seed from the environment.
pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    // build state
    let state = build_state()?;
    // Start the Web Server
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([0, 0, 0, 0], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Result<Arc<AppState>> {
    let tuning_path = config::tuning_path();
    let tuning = config::load_tuning(tuning_path.clone()).inspect_err(|e| {
        tracing::error!(error = %e, "failed to load tuning");
    })?;
    let seed = config::world_seed().inspect_err(|e| {
        tracing::error!(error = %e, "invalid world seed");
    })?;
    tracing::debug!(
        tuning_path = ?tuning_path,
        seed = ?seed,
        world_max = tuning.world.max,
        "world configured"
    );

    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    // input_tx/rx: every connection event and input goes to the single world task.
    let (input_tx, input_rx) = mpsc::channel::<GameEvent>(config::INPUT_CHANNEL_CAPACITY);
    let (chat_tx, _chat_rx) = broadcast::channel(config::CHAT_BROADCAST_CAPACITY);

    // The world task is the only owner of simulation state.
    tokio::spawn(world_task(
        input_rx,
        World::new(tuning, rng),
        SimClock,
        config::TICK_INTERVAL,
    ));

    Ok(Arc::new(AppState { input_tx, chat_tx }))
}
