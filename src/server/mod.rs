//! Dashboard server: serves run results, artifacts, and live predictions
//! from a finished pipeline run

mod error;
mod handlers;
mod state;

pub use error::ServerError;
pub use state::{ScoreRow, ServeState};

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

use crate::pipeline::PipelineRun;

/// Serving options lifted from the pipeline config
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub host: String,
    pub port: u16,
    pub artifact_dir: PathBuf,
    pub monitor_interval_secs: u64,
}

pub fn create_router(state: Arc<ServeState>, artifact_dir: &PathBuf) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::get_metrics))
        .route("/importance", get(handlers::get_importance))
        .route("/monitor", get(handlers::get_monitor))
        .route("/schema", get(handlers::get_schema))
        .route("/predict", post(handlers::predict));

    Router::new()
        .route("/", get(handlers::dashboard))
        .nest("/api", api_routes)
        .nest_service("/artifacts", ServeDir::new(artifact_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

/// Serve a finished run until ctrl+c. A background task keeps appending
/// monitor samples against the held-out partition.
pub async fn run_server(run: PipelineRun, options: ServeOptions) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    let state = Arc::new(ServeState::from_run(run)?);

    // Periodic monitoring in the background
    let monitor_state = Arc::clone(&state);
    let interval_secs = options.monitor_interval_secs.max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.tick().await; // first tick is immediate, skip it
        loop {
            interval.tick().await;
            let mut monitor = monitor_state.monitor.write().await;
            if let Err(e) =
                monitor.observe(&monitor_state.model, &monitor_state.x_test, &monitor_state.y_test)
            {
                tracing::warn!(error = %e, "Monitor observation failed");
            }
        }
    });

    let app = create_router(Arc::clone(&state), &options.artifact_dir);

    let addr: SocketAddr = format!("{}:{}", options.host, options.port).parse()?;
    info!(
        address = %addr,
        best_model = %state.best_name,
        started_at = %start_time.to_rfc3339(),
        "Dashboard server starting"
    );
    info!(url = %format!("http://{}", addr), "Dashboard available");
    info!(url = %format!("http://{}/api/health", addr), "Health endpoint available");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown_signal = async move {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::error!("Failed to install CTRL+C signal handler");
            return;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
