//! Handles settings for the application. Values come from an optional
//! `settings.toml` in the working directory, overridden by environment
//! variables of the same (upper-cased) name.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub session_secret: String,
    pub google_client_id: String,
    pub paypal_client_id: String,
    pub paypal_client_secret: String,
    pub paypal_api_base: String,
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub static_dir: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()?;

        settings.try_deserialize()
    }
}
