use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::rate_limit::{parse_tiers, RateLimitTier};

const DEFAULT_RATE_LIMIT_TIERS: &str = "1/minute,50/hour,200/day";

/// Application configuration loaded from environment variables.
/// Fails at startup if a value is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Origins granted CORS access. Empty means no cross-origin access.
    pub allowed_origins: Vec<String>,
    /// Static credential expected in `X-API-Key`. `None` disables authentication.
    pub api_key: Option<String>,
    /// Checked lazily on first provider use, not here.
    pub gemini_api_key: Option<String>,
    pub rate_limit_tiers: Vec<RateLimitTier>,
    pub provider_timeout: Duration,
    pub provider_pool_size: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            allowed_origins: parse_origins(&std::env::var("ALLOWED_ORIGINS").unwrap_or_default()),
            api_key: optional_env("X_API_KEY"),
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            rate_limit_tiers: parse_tiers(
                &std::env::var("RATE_LIMIT_TIERS")
                    .unwrap_or_else(|_| DEFAULT_RATE_LIMIT_TIERS.to_string()),
            )
            .context("RATE_LIMIT_TIERS is invalid")?,
            provider_timeout: parse_timeout_secs(
                &std::env::var("PROVIDER_TIMEOUT_SECS").unwrap_or_else(|_| "30".to_string()),
            )
            .context("PROVIDER_TIMEOUT_SECS is invalid")?,
            provider_pool_size: std::env::var("PROVIDER_POOL_SIZE")
                .unwrap_or_else(|_| "8".to_string())
                .parse::<usize>()
                .context("PROVIDER_POOL_SIZE must be a positive integer")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Unset and blank are treated the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_timeout_secs(raw: &str) -> Result<Duration> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .with_context(|| format!("'{raw}' is not a whole number of seconds"))?;
    if secs == 0 {
        bail!("provider deadline must be at least one second");
    }
    Ok(Duration::from_secs(secs))
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
impl Config {
    /// Configuration used by router and pipeline tests.
    pub fn for_tests() -> Self {
        Config {
            allowed_origins: vec!["http://localhost:5173".to_string()],
            api_key: Some("test-api-key-12345".to_string()),
            gemini_api_key: None,
            rate_limit_tiers: parse_tiers("100/minute").expect("valid tiers"),
            provider_timeout: Duration::from_secs(30),
            provider_pool_size: 4,
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_trims_and_skips_blanks() {
        assert_eq!(
            parse_origins(" https://a.example , ,https://b.example"),
            vec!["https://a.example", "https://b.example"]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_timeout_rejects_zero_and_garbage() {
        assert_eq!(parse_timeout_secs("45").unwrap(), Duration::from_secs(45));
        assert!(parse_timeout_secs("0").is_err());
        assert!(parse_timeout_secs("soon").is_err());
    }

    #[test]
    fn test_default_tiers_parse() {
        let tiers = parse_tiers(DEFAULT_RATE_LIMIT_TIERS).unwrap();
        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[0].limit, 1);
    }
}
