use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use backend::config::AppConfig;
use backend::session::SessionStore;
use backend::web_server::{run_server, AppState};
use chrono::Duration;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    // An unopenable database is fatal; nothing works without it.
    let connect_options = SqliteConnectOptions::from_str(&config.database.url)
        .context("Invalid database URL")?
        .create_if_missing(true);
    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await
        .context("Failed to open database")?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete.");

    let sessions = Arc::new(SessionStore::new(Duration::hours(config.session.ttl_hours)));

    let app_state = AppState {
        db_pool,
        sessions,
        config,
    };

    run_server(app_state).await
}
