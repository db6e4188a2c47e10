use std::net::SocketAddr;

use axum::Router;
use configs::AppConfig;
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::routes;
use crate::state::AppState;
use service::runtime;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Prepare directories and shared state, then return the ready router.
pub async fn build_app(cfg: AppConfig) -> anyhow::Result<Router> {
    runtime::ensure_env(&cfg).await?;
    let state = AppState::build(cfg).await?;
    Ok(routes::build_router(state, build_cors()))
}

/// Serve with an explicit configuration.
pub async fn run_with(cfg: AppConfig) -> anyhow::Result<()> {
    let addr = bind_addr(&cfg)?;
    let backend = cfg.backend.base_url.clone();
    let app = build_app(cfg).await?;

    info!(%addr, %backend, "starting site gateway");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Public entry: load `.env` and config, then serve.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = AppConfig::load_and_validate()?;
    run_with(cfg).await
}
