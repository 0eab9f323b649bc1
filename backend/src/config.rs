use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use dotenvy::dotenv;

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub addr: String,
    pub port: u16,
    pub static_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Lifetime of a session (and its cookie), in hours.
    pub ttl_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub web: WebConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, figment::Error> {
        dotenv().ok();

        let config = Figment::new()
            .merge(Toml::file("Config.toml")) // Non-sensitive defaults
            .merge(Env::prefixed("APP_").split("__")) // e.g. APP_DATABASE__URL
            .extract();

        tracing::info!("Configuration loaded: {:?}", config);

        config
    }
}
