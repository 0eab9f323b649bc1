// backend/tests/helpers.rs
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use backend::config::{AppConfig, DatabaseConfig, SessionConfig, WebConfig};
use backend::session::SessionStore;
use backend::web_server::{create_router, AppState};
use chrono::Duration;
use reqwest::StatusCode;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::net::TcpListener;

pub const TEST_USERNAME: &str = "admin";
pub const TEST_PASSWORD: &str = "correct-horse-battery-staple";
pub const TEST_DB_URL: &str = "sqlite::memory:";

/// Build an `AppState` backed by a fresh in-memory database.
pub async fn build_state() -> AppState {
    let connect_options = SqliteConnectOptions::from_str(TEST_DB_URL).unwrap();

    // A single connection keeps every query on the same in-memory db.
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options)
        .await
        .expect("Failed to create in-memory database pool.");

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run migrations on test database.");

    let config = AppConfig {
        web: WebConfig {
            addr: "127.0.0.1".to_string(),
            port: 0,
            static_dir: "static".to_string(),
        },
        // Handlers use the pool injected below, never this url; it is
        // filled in only because AppConfig requires the field.
        database: DatabaseConfig {
            url: TEST_DB_URL.to_string(),
        },
        session: SessionConfig { ttl_hours: 24 },
    };

    AppState {
        db_pool,
        sessions: Arc::new(SessionStore::new(Duration::hours(24))),
        config,
    }
}

/// Spawn a test server on a random port and return its address, a
/// cookie-keeping client and a handle on the underlying pool.
pub async fn spawn_app() -> (SocketAddr, reqwest::Client, SqlitePool) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app_state = build_state().await;
    let db_pool = app_state.db_pool.clone();
    let app = create_router(app_state);

    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });

    let client = reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    (addr, client, db_pool)
}

/// Register and login the default test user. The session cookie ends up
/// in the client's jar, so subsequent requests are authenticated.
pub async fn register_and_login(addr: &SocketAddr, client: &reqwest::Client) {
    let credentials = serde_json::json!({
        "username": TEST_USERNAME,
        "password": TEST_PASSWORD,
    });

    let response = client
        .post(format!("http://{addr}/api/register"))
        .json(&credentials)
        .send()
        .await
        .expect("Failed to register test user");
    assert_eq!(response.status(), StatusCode::OK, "Registration failed");

    let response = client
        .post(format!("http://{addr}/api/login"))
        .json(&credentials)
        .send()
        .await
        .expect("Failed to login test user");
    assert_eq!(response.status(), StatusCode::OK, "Login failed");
}
