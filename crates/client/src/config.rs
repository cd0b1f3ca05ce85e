//! Hub configuration.

use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::endpoint::Endpoint;

/// Configuration for auto-reconnect behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Reconnect after an unexpected close
    pub enabled: bool,
    /// Consecutive unexpected closes tolerated before giving up
    pub max_attempts: u32,
    /// Fixed delay before each reconnect
    pub delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 5,
            delay: Duration::from_millis(3000),
        }
    }
}

impl ReconnectConfig {
    /// Whether another reconnect is allowed after `attempts` consecutive
    /// unexpected closes.
    pub fn allows(&self, attempts: u32) -> bool {
        self.enabled && attempts < self.max_attempts
    }
}

/// Settings supplied when a hub is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Connect on construction when a credential is available
    pub auto_connect: bool,
    pub reconnect: ReconnectConfig,
    /// Interval between liveness pings; zero disables them
    pub heartbeat_interval: Duration,
    pub endpoint: Endpoint,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            auto_connect: true,
            reconnect: ReconnectConfig::default(),
            heartbeat_interval: Duration::from_millis(30000),
            endpoint: Endpoint::default(),
        }
    }
}

impl HubConfig {
    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }

    pub fn with_auto_reconnect(mut self, auto_reconnect: bool) -> Self {
        self.reconnect.enabled = auto_reconnect;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect.delay = delay;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, max_attempts: u32) -> Self {
        self.reconnect.max_attempts = max_attempts;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Build configuration from environment variables.
    ///
    /// Environment variables:
    /// - `REASONBRIDGE_PAGE_URL`: URL of the hosting page, source of scheme and host (default: "http://localhost:3000")
    /// - `REASONBRIDGE_WS_HOST`: host override (default: page host)
    /// - `REASONBRIDGE_WS_PATH`: endpoint path (default: "/ws")
    /// - `REASONBRIDGE_AUTO_CONNECT`, `REASONBRIDGE_AUTO_RECONNECT`: booleans (default: true)
    /// - `REASONBRIDGE_RECONNECT_DELAY_MS` (default: 3000)
    /// - `REASONBRIDGE_MAX_RECONNECT_ATTEMPTS` (default: 5)
    /// - `REASONBRIDGE_HEARTBEAT_INTERVAL_MS` (default: 30000)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Unparseable values are logged and replaced by their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let page = lookup("REASONBRIDGE_PAGE_URL").unwrap_or_else(|| "http://localhost:3000".to_string());
        let mut endpoint = match Url::parse(&page)
            .map_err(crate::error::HubError::from)
            .and_then(|url| Endpoint::for_page(&url))
        {
            Ok(endpoint) => endpoint,
            Err(e) => {
                crate::log_warn!("Ignoring REASONBRIDGE_PAGE_URL '{}': {}", page, e);
                defaults.endpoint.clone()
            }
        };
        if let Some(host) = lookup("REASONBRIDGE_WS_HOST").filter(|h| !h.is_empty()) {
            endpoint = endpoint.with_host(host);
        }
        if let Some(path) = lookup("REASONBRIDGE_WS_PATH").filter(|p| !p.is_empty()) {
            endpoint = endpoint.with_path(path);
        }

        Self {
            auto_connect: parse_flag(&lookup, "REASONBRIDGE_AUTO_CONNECT", defaults.auto_connect),
            reconnect: ReconnectConfig {
                enabled: parse_flag(&lookup, "REASONBRIDGE_AUTO_RECONNECT", defaults.reconnect.enabled),
                max_attempts: parse_value(
                    &lookup,
                    "REASONBRIDGE_MAX_RECONNECT_ATTEMPTS",
                    defaults.reconnect.max_attempts,
                ),
                delay: Duration::from_millis(parse_value(
                    &lookup,
                    "REASONBRIDGE_RECONNECT_DELAY_MS",
                    defaults.reconnect.delay.as_millis() as u64,
                )),
            },
            heartbeat_interval: Duration::from_millis(parse_value(
                &lookup,
                "REASONBRIDGE_HEARTBEAT_INTERVAL_MS",
                defaults.heartbeat_interval.as_millis() as u64,
            )),
            endpoint,
        }
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            crate::log_warn!("Ignoring {}='{}': expected a boolean", key, raw);
            default
        }
    }
}

fn parse_value<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(e) => {
            crate::log_warn!("Ignoring {}='{}': {}", key, raw, e);
            default
        }
    }
}
