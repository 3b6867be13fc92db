use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::urls::SupportedHosts;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Receiver
    pub supported_hosts: SupportedHosts,
    pub token: Option<String>,
    pub webhook_url: Option<String>,

    // Storage; in-memory when unset
    pub database_url: Option<String>,
    pub pending_batch_size: i64,

    // Web server
    pub api_host: String,
    pub api_port: u16,

    // Processing
    pub process_interval: Duration,
    pub verify_timeout: Duration,
    pub process_concurrency: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let supported_hosts = SupportedHosts::from_csv(
            &env::var("SUPPORTED_HOSTS").context("SUPPORTED_HOSTS environment variable is required")?,
        );
        if supported_hosts.is_empty() {
            bail!("SUPPORTED_HOSTS must list at least one host");
        }

        let config = Self {
            supported_hosts,
            token: optional_env("WEBMENTION_TOKEN"),
            webhook_url: optional_env("WEBHOOK_URL"),
            database_url: optional_env("DATABASE_URL"),
            pending_batch_size: parsed_env("PENDING_BATCH_SIZE", 100)?,
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: parsed_env("API_PORT", 3000)?,
            process_interval: Duration::from_secs(parsed_env("PROCESS_INTERVAL_SECS", 300)?),
            verify_timeout: Duration::from_secs(parsed_env("VERIFY_TIMEOUT_SECS", 10)?),
            process_concurrency: parsed_env::<usize>("PROCESS_CONCURRENCY", 8)?.max(1),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {

        tracing::info!("Config loaded:");
        tracing::info!("  SUPPORTED_HOSTS: {}", self.supported_hosts.hosts().join(","));
        tracing::info!("  WEBMENTION_TOKEN: {}", preview(&self.token));
        tracing::info!("  WEBHOOK_URL: {}", preview(&self.webhook_url));
        tracing::info!(
            "  DATABASE_URL: {}",
            if self.database_url.is_some() { "<set>" } else { "<not set, using memory store>" }
        );
        tracing::info!("  PROCESS_INTERVAL_SECS: {}", self.process_interval.as_secs());
    }
}

/// First three characters and the length, for logging secrets.
fn preview(val: &Option<String>) -> String {
    match val {
        Some(v) if !v.is_empty() => {
            let head: String = v.chars().take(3).collect();
            format!("{}...({} chars)", head, v.chars().count())
        }
        _ => "<not set>".to_string(),
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} must be a number: {e}")),
        Err(_) => Ok(default),
    }
}
