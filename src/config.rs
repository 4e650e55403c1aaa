use anyhow::{Context, Result};
use std::time::Duration;

use crate::{service, shortcode};

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind the HTTP server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Public base URL used when generating short links, e.g. "https://go.example.com"
    /// Never has a trailing slash.
    pub base_url: String,

    /// Validity applied when a create request carries none (or a non-positive one).
    pub default_validity_minutes: i64,

    /// How many generated codes to try before giving up on a create.
    pub max_allocation_attempts: u32,

    /// Length of generated shortcodes.
    pub shortcode_length: usize,

    /// Remote audit log collector. `None` keeps audit records local.
    pub audit_log_url: Option<String>,

    /// Bearer token sent to the audit log collector.
    pub audit_log_token: Option<String>,

    pub audit_log_timeout: Duration,

    /// How often expired links are purged from memory. `None` keeps them forever.
    pub purge_interval: Option<Duration>,
}

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = var("PORT")
            .unwrap_or_else(|| "8080".into())
            .parse::<u16>()
            .context("PORT must be a valid port number (1–65535)")?;

        let base_url = var("BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_owned();

        let default_validity_minutes = match var("DEFAULT_VALIDITY_MINUTES") {
            Some(raw) => raw
                .parse::<i64>()
                .context("DEFAULT_VALIDITY_MINUTES must be an integer")?,
            None => service::DEFAULT_VALIDITY_MINUTES,
        };
        if !(1..=service::MAX_VALIDITY_MINUTES).contains(&default_validity_minutes) {
            anyhow::bail!(
                "DEFAULT_VALIDITY_MINUTES must be between 1 and {}",
                service::MAX_VALIDITY_MINUTES
            );
        }

        let max_allocation_attempts = match var("MAX_ALLOCATION_ATTEMPTS") {
            Some(raw) => raw
                .parse::<u32>()
                .context("MAX_ALLOCATION_ATTEMPTS must be a positive integer")?,
            None => service::DEFAULT_MAX_ATTEMPTS,
        };
        if max_allocation_attempts == 0 {
            anyhow::bail!("MAX_ALLOCATION_ATTEMPTS must be at least 1");
        }

        let shortcode_length = match var("SHORTCODE_LENGTH") {
            Some(raw) => raw
                .parse::<usize>()
                .context("SHORTCODE_LENGTH must be an integer")?,
            None => shortcode::DEFAULT_LEN,
        };
        if !(shortcode::MIN_LEN..=shortcode::MAX_LEN).contains(&shortcode_length) {
            anyhow::bail!(
                "SHORTCODE_LENGTH must be between {} and {}",
                shortcode::MIN_LEN,
                shortcode::MAX_LEN
            );
        }

        let audit_log_timeout = Duration::from_secs(
            var("AUDIT_LOG_TIMEOUT_SECS")
                .and_then(|raw| raw.parse::<u64>().ok())
                .unwrap_or(3),
        );

        let purge_interval = match var("PURGE_INTERVAL_MINUTES") {
            Some(raw) => {
                let minutes = raw
                    .parse::<u64>()
                    .context("PURGE_INTERVAL_MINUTES must be a non-negative integer")?;
                (minutes > 0).then(|| Duration::from_secs(minutes * 60))
            }
            None => None,
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            base_url,
            default_validity_minutes,
            max_allocation_attempts,
            shortcode_length,
            audit_log_url: var("AUDIT_LOG_URL").filter(|s| !s.trim().is_empty()),
            audit_log_token: var("AUDIT_LOG_TOKEN").filter(|s| !s.trim().is_empty()),
            audit_log_timeout,
            purge_interval,
        })
    }

    /// The public short link for `code`.
    pub fn short_link(&self, code: &str) -> String {
        format!("{}/{}", self.base_url, code)
    }
}
