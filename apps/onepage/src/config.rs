use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Runtime configuration loaded from environment variables (and `.env`).
/// CLI flags override these values in `main`.
#[derive(Debug, Clone)]
pub struct Config {
    pub soffice_path: Option<PathBuf>,
    pub convert_timeout: Duration,
    pub max_fit_attempts: u32,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            soffice_path: None,
            convert_timeout: Duration::from_secs(120),
            max_fit_attempts: 12,
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        let convert_timeout = match lookup("CONVERT_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.trim()
                    .parse::<u64>()
                    .context("CONVERT_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            None => defaults.convert_timeout,
        };
        anyhow::ensure!(
            !convert_timeout.is_zero(),
            "CONVERT_TIMEOUT_SECS must be at least 1"
        );

        let max_fit_attempts = match lookup("MAX_FIT_ATTEMPTS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .context("MAX_FIT_ATTEMPTS must be a positive integer")?,
            None => defaults.max_fit_attempts,
        };
        anyhow::ensure!(max_fit_attempts >= 1, "MAX_FIT_ATTEMPTS must be at least 1");

        Ok(Config {
            soffice_path: lookup("SOFFICE_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            convert_timeout,
            max_fit_attempts,
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
        })
    }
}
