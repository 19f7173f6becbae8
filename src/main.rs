use std::env;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use ino_backend::config::AppConfig;
use ino_backend::logging;
use ino_backend::server::router::router;
use ino_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    logging::init(&config.log_dir);

    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(config.server.port);
    let bind_addr = format!("{}:{}", config.server.host, port);

    let state = AppState::initialize(config).await?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
