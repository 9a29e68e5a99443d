use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Runtime configuration for the storefront cache and its remote client.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub stale_time: Duration,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
    pub event_capacity: usize,
}

impl Config {
    const DEFAULT_API_URL: &str = "http://localhost:8000/api";
    const DEFAULT_STALE_TIME_SECS: u64 = 300;
    const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
    const DEFAULT_EVENT_CAPACITY: usize = 256;

    pub fn from_env() -> Self {
        let api_url = std::env::var("SHOPFRONT_API_URL")
            .unwrap_or_else(|_| Self::DEFAULT_API_URL.to_string());

        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            stale_time: Duration::from_secs(parse_var(
                "SHOPFRONT_STALE_TIME_SECS",
                Self::DEFAULT_STALE_TIME_SECS,
            )),
            retry_delay: Duration::from_millis(parse_var(
                "SHOPFRONT_RETRY_DELAY_MS",
                Self::DEFAULT_RETRY_DELAY_MS,
            )),
            request_timeout: Duration::from_secs(parse_var(
                "SHOPFRONT_REQUEST_TIMEOUT_SECS",
                Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            event_capacity: parse_var("SHOPFRONT_EVENT_CAPACITY", Self::DEFAULT_EVENT_CAPACITY),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: Self::DEFAULT_API_URL.to_string(),
            stale_time: Duration::from_secs(Self::DEFAULT_STALE_TIME_SECS),
            retry_delay: Duration::from_millis(Self::DEFAULT_RETRY_DELAY_MS),
            request_timeout: Duration::from_secs(Self::DEFAULT_REQUEST_TIMEOUT_SECS),
            event_capacity: Self::DEFAULT_EVENT_CAPACITY,
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
