use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// One `(limit, window)` pair, written as `"<limit>/<unit>"`, e.g. `"2/minute"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitTier {
    pub limit: u32,
    pub window: Duration,
}

impl RateLimitTier {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }
}

impl FromStr for RateLimitTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (limit, unit) = s
            .trim()
            .split_once('/')
            .with_context(|| format!("rate limit tier '{s}' must look like '<limit>/<unit>'"))?;

        let limit: u32 = limit
            .trim()
            .parse()
            .with_context(|| format!("rate limit tier '{s}' has a non-numeric limit"))?;
        if limit == 0 {
            bail!("rate limit tier '{s}' must allow at least one request");
        }

        let secs = match unit.trim().to_ascii_lowercase().as_str() {
            "second" | "sec" | "s" => 1,
            "minute" | "min" | "m" => 60,
            "hour" | "h" => 3600,
            "day" | "d" => 86_400,
            other => bail!("rate limit tier '{s}' has unknown unit '{other}'"),
        };

        Ok(Self::new(limit, Duration::from_secs(secs)))
    }
}

impl fmt::Display for RateLimitTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}s", self.limit, self.window.as_secs())
    }
}

/// Parses a comma-separated tier list such as `"1/minute,50/hour,200/day"`.
pub fn parse_tiers(spec: &str) -> Result<Vec<RateLimitTier>> {
    let tiers = spec
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| part.parse::<RateLimitTier>())
        .collect::<Result<Vec<RateLimitTier>>>()?;

    if tiers.is_empty() {
        bail!("at least one rate limit tier must be configured");
    }
    Ok(tiers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_tier() {
        let tier: RateLimitTier = "2/minute".parse().unwrap();
        assert_eq!(tier, RateLimitTier::new(2, Duration::from_secs(60)));
    }

    #[test]
    fn test_parse_tier_list_with_spaces() {
        let tiers = parse_tiers(" 1/minute, 50/hour ,200/day").unwrap();
        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[1].window, Duration::from_secs(3600));
        assert_eq!(tiers[2].limit, 200);
    }

    #[test]
    fn test_parse_rejects_unknown_unit() {
        assert!("5/fortnight".parse::<RateLimitTier>().is_err());
    }

    #[test]
    fn test_parse_rejects_zero_limit() {
        assert!("0/minute".parse::<RateLimitTier>().is_err());
    }

    #[test]
    fn test_parse_rejects_empty_list() {
        assert!(parse_tiers(" , ").is_err());
    }
}
