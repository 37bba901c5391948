mod routes;
mod schemas;
mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{info, warn};
use wm_service::RemoteLoader;

use crate::config::AppConfig;
use crate::outputs::OutputStore;
use crate::server::routes::api_routes;
use crate::server::state::AppState;
use crate::studio::Studio;

pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let config = Arc::new(config);

    let outputs = Arc::new(OutputStore::open(&config.output_dir, config.retention).await?);
    let _sweeper = outputs.spawn_sweeper(config.sweep_interval);

    let loader = RemoteLoader::new(config.service_url.clone())
        .context("Failed to create model service client")?;
    info!("Using model service at {}", config.service_url);

    let studio = Studio::new(config.clone(), Arc::new(loader), outputs);
    let app = router(Arc::new(AppState::new(Arc::new(studio))));

    let addr = config.addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("{} listening on http://{}", config.profile.title(), addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    Ok(())
}

pub(crate) fn router(state: Arc<AppState>) -> Router {
    let config = state.studio.config();
    let outputs = ServeDir::new(state.studio.outputs().root());
    let body_limit = DefaultBodyLimit::max(config.max_upload_bytes);

    Router::new()
        .merge(api_routes(config.profile))
        .nest_service("/outputs", outputs)
        .layer(body_limit)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
