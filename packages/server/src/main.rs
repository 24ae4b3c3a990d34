use anyhow::Context;
use tracing::info;

use recipebox_server::config::AppConfig;
use recipebox_server::database::init_db;
use recipebox_server::state::AppState;
use recipebox_server::{build_router, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level())
        .with_target(false)
        .init();

    let db = init_db(&config.database)
        .await
        .context("Failed to connect to database")?;

    seed::ensure_indexes(&db)
        .await
        .context("Failed to ensure indexes")?;
    seed::seed_admin(&db, config.admin.as_ref())
        .await
        .context("Failed to seed admin account")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState { db, config };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
