//! Configuration loaded from the process environment.
//!
//! Every field maps to an upper-case environment variable of the same name
//! (`REFRESH_INTERVAL`, `AVATAR_TTL`, ...). Durations accept either a bare
//! number of seconds or a unit-suffixed string such as `"90s"`, `"5m"` or
//! `"24h"`.

use anyhow::Context;
use figment::Figment;
use figment::providers::Env;
use fundu::DurationParser;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

use crate::cache::CacheTtls;
use crate::jobs::RefreshPolicy;
use crate::scraper::YoutubeScraper;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Grace period for services to stop after a shutdown signal.
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,

    #[serde(default = "default_search_query")]
    pub search_query: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(
        default = "default_refresh_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub refresh_interval: Duration,
    #[serde(
        default = "default_drain_check_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub drain_check_interval: Duration,
    #[serde(
        default = "default_drain_item_delay",
        deserialize_with = "deserialize_duration"
    )]
    pub drain_item_delay: Duration,
    #[serde(
        default = "default_navigation_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub navigation_timeout: Duration,
    #[serde(
        default = "default_cold_start_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub cold_start_timeout: Duration,

    /// Unset keeps each result set until the next refresh replaces it.
    #[serde(default, deserialize_with = "deserialize_optional_duration")]
    pub live_ttl: Option<Duration>,
    #[serde(
        default = "default_avatar_ttl",
        deserialize_with = "deserialize_duration"
    )]
    pub avatar_ttl: Duration,
    #[serde(
        default = "default_subscriber_ttl",
        deserialize_with = "deserialize_duration"
    )]
    pub subscriber_ttl: Duration,

    #[serde(default = "default_youtube_base_url")]
    pub youtube_base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_search_query() -> String {
    RefreshPolicy::default().query
}

fn default_max_results() -> usize {
    RefreshPolicy::default().max_results
}

fn default_refresh_interval() -> Duration {
    RefreshPolicy::default().refresh_interval
}

fn default_drain_check_interval() -> Duration {
    RefreshPolicy::default().drain_check_interval
}

fn default_drain_item_delay() -> Duration {
    RefreshPolicy::default().drain_item_delay
}

fn default_navigation_timeout() -> Duration {
    RefreshPolicy::default().navigation_timeout
}

fn default_cold_start_timeout() -> Duration {
    RefreshPolicy::default().cold_start_timeout
}

fn default_avatar_ttl() -> Duration {
    CacheTtls::default().avatar
}

fn default_subscriber_ttl() -> Duration {
    CacheTtls::default().subscribers
}

fn default_youtube_base_url() -> String {
    "https://www.youtube.com".to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_rate_limit_per_minute() -> u32 {
    10
}

impl Config {
    /// Load from the raw environment. `.env` should already be applied.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_figment(Figment::new().merge(Env::raw()))
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config: Config = figment.extract().context("Failed to load config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("REFRESH_INTERVAL", self.refresh_interval),
            ("DRAIN_CHECK_INTERVAL", self.drain_check_interval),
            ("NAVIGATION_TIMEOUT", self.navigation_timeout),
        ] {
            if value.is_zero() {
                anyhow::bail!("{name} must be greater than zero");
            }
        }
        if self.max_results == 0 {
            anyhow::bail!("MAX_RESULTS must be at least 1");
        }
        url::Url::parse(&self.youtube_base_url)
            .with_context(|| format!("Invalid YOUTUBE_BASE_URL: {}", self.youtube_base_url))?;
        Ok(())
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            query: self.search_query.clone(),
            max_results: self.max_results,
            refresh_interval: self.refresh_interval,
            drain_check_interval: self.drain_check_interval,
            drain_item_delay: self.drain_item_delay,
            navigation_timeout: self.navigation_timeout,
            cold_start_timeout: self.cold_start_timeout,
        }
    }

    pub fn cache_ttls(&self) -> CacheTtls {
        CacheTtls {
            live: self.live_ttl,
            avatar: self.avatar_ttl,
            subscribers: self.subscriber_ttl,
        }
    }

    pub fn scraper(&self) -> YoutubeScraper {
        YoutubeScraper::new(
            self.youtube_base_url.clone(),
            self.user_agent.clone(),
            self.navigation_timeout,
        )
    }
}

/// Parse `"90"`, `"90s"`, `"5m"`, `"1.5h"` and friends.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let parsed = DurationParser::with_all_time_units()
        .parse(input.trim())
        .map_err(|e| format!("invalid duration '{input}': {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration '{input}': {e}"))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Text(String),
}

impl RawDuration {
    fn into_duration(self) -> Result<Duration, String> {
        match self {
            RawDuration::Seconds(secs) => Ok(Duration::from_secs(secs)),
            RawDuration::Text(text) => parse_duration(&text),
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    RawDuration::deserialize(deserializer)?
        .into_duration()
        .map_err(serde::de::Error::custom)
}

/// Empty strings count as unset.
fn deserialize_optional_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawDuration>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawDuration::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(raw) => raw.into_duration().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::{Format, Toml};

    fn load(toml: &str) -> anyhow::Result<Config> {
        Config::from_figment(Figment::new().merge(Toml::string(toml)))
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load("").unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.search_query, "soulcity");
        assert_eq!(config.refresh_interval, Duration::from_secs(300));
        assert_eq!(config.live_ttl, None);
        assert_eq!(config.avatar_ttl, Duration::from_secs(86_400));
        assert_eq!(config.subscriber_ttl, Duration::from_secs(1_800));
        assert_eq!(config.rate_limit_per_minute, 10);
    }

    #[test]
    fn durations_accept_units_and_seconds() {
        let config = load(
            r#"
            refresh_interval = "2m"
            drain_item_delay = "500ms"
            navigation_timeout = 8
            live_ttl = "1h"
            "#,
        )
        .unwrap();
        assert_eq!(config.refresh_interval, Duration::from_secs(120));
        assert_eq!(config.drain_item_delay, Duration::from_millis(500));
        assert_eq!(config.navigation_timeout, Duration::from_secs(8));
        assert_eq!(config.live_ttl, Some(Duration::from_secs(3_600)));
    }

    #[test]
    fn empty_live_ttl_is_permanent() {
        assert_eq!(load(r#"live_ttl = """#).unwrap().live_ttl, None);
    }

    #[test]
    fn rejects_zero_interval_and_garbage() {
        assert!(load("refresh_interval = 0").is_err());
        assert!(load(r#"drain_check_interval = "soon""#).is_err());
        assert!(load("max_results = 0").is_err());
    }

    #[test]
    fn policy_and_ttls_mirror_config() {
        let config = load(
            r#"
            search_query = "nopixel"
            max_results = 5
            subscriber_ttl = "10m"
            "#,
        )
        .unwrap();
        let policy = config.refresh_policy();
        assert_eq!(policy.query, "nopixel");
        assert_eq!(policy.max_results, 5);
        assert_eq!(config.cache_ttls().subscribers, Duration::from_secs(600));
    }

    #[test]
    fn parse_duration_handles_whitespace() {
        assert_eq!(parse_duration(" 30s "), Ok(Duration::from_secs(30)));
        assert!(parse_duration("").is_err());
    }
}
