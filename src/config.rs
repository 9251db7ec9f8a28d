//! Environment-sourced configuration

use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SYMBOL: &str = "SPY";
pub const DEFAULT_CYCLE_INTERVAL_SECONDS: u64 = 300;
pub const DEFAULT_COLLABORATOR_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_LOWER_THRESHOLD: i64 = 500;
pub const DEFAULT_UPPER_THRESHOLD: i64 = 510;

/// Returns the deployment environment (`production`, `sandbox`, ...)
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string())
}

pub fn is_production_environment(environment: &str) -> bool {
    matches!(environment, "production" | "prod")
}

/// Credentials for the brokerage account (both halves required)
#[derive(Clone)]
pub struct AlpacaCredentials {
    pub key: String,
    pub secret: String,
}

impl std::fmt::Debug for AlpacaCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaCredentials")
            .field("key", &"***")
            .field("secret", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub port: u16,
    pub symbol: String,
    pub polygon_key: Option<String>,
    pub polygon_base_url: Option<String>,
    pub alpaca: Option<AlpacaCredentials>,
    pub alpaca_paper: bool,
    pub alpaca_base_url: Option<String>,
    pub cycle_interval: Duration,
    pub collaborator_timeout: Duration,
    pub lower_threshold: Decimal,
    pub upper_threshold: Decimal,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "sandbox".to_string(),
            port: DEFAULT_PORT,
            symbol: DEFAULT_SYMBOL.to_string(),
            polygon_key: None,
            polygon_base_url: None,
            alpaca: None,
            alpaca_paper: true,
            alpaca_base_url: None,
            cycle_interval: Duration::from_secs(DEFAULT_CYCLE_INTERVAL_SECONDS),
            collaborator_timeout: Duration::from_secs(DEFAULT_COLLABORATOR_TIMEOUT_SECONDS),
            lower_threshold: Decimal::from(DEFAULT_LOWER_THRESHOLD),
            upper_threshold: Decimal::from(DEFAULT_UPPER_THRESHOLD),
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Empty values count as unset. Values that fail to parse fall back to
    /// the default and log a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let alpaca = match (get("ALPACA_KEY"), get("ALPACA_SECRET")) {
            (Some(key), Some(secret)) => Some(AlpacaCredentials { key, secret }),
            (Some(_), None) | (None, Some(_)) => {
                warn!("Only one of ALPACA_KEY / ALPACA_SECRET is set - brokerage disabled");
                None
            }
            (None, None) => None,
        };

        let alpaca_paper = get("ALPACA_PAPER")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        let mut config = Self {
            environment: get("ENVIRONMENT").unwrap_or(defaults.environment),
            port: parse_or("PORT", get("PORT"), defaults.port),
            symbol: get("SYMBOL")
                .map(|s| s.to_ascii_uppercase())
                .unwrap_or(defaults.symbol),
            polygon_key: get("POLYGON_KEY"),
            polygon_base_url: get("POLYGON_BASE_URL"),
            alpaca,
            alpaca_paper,
            alpaca_base_url: get("ALPACA_BASE_URL"),
            cycle_interval: Duration::from_secs(parse_or(
                "CYCLE_INTERVAL_SECONDS",
                get("CYCLE_INTERVAL_SECONDS"),
                DEFAULT_CYCLE_INTERVAL_SECONDS,
            )),
            collaborator_timeout: Duration::from_secs(parse_or(
                "COLLABORATOR_TIMEOUT_SECONDS",
                get("COLLABORATOR_TIMEOUT_SECONDS"),
                DEFAULT_COLLABORATOR_TIMEOUT_SECONDS,
            )),
            lower_threshold: parse_or(
                "SIGNAL_LOWER_THRESHOLD",
                get("SIGNAL_LOWER_THRESHOLD"),
                defaults.lower_threshold,
            ),
            upper_threshold: parse_or(
                "SIGNAL_UPPER_THRESHOLD",
                get("SIGNAL_UPPER_THRESHOLD"),
                defaults.upper_threshold,
            ),
        };

        if config.cycle_interval.is_zero() {
            warn!("CYCLE_INTERVAL_SECONDS must be > 0, using default");
            config.cycle_interval = Duration::from_secs(DEFAULT_CYCLE_INTERVAL_SECONDS);
        }
        if config.collaborator_timeout.is_zero() {
            warn!("COLLABORATOR_TIMEOUT_SECONDS must be > 0, using default");
            config.collaborator_timeout =
                Duration::from_secs(DEFAULT_COLLABORATOR_TIMEOUT_SECONDS);
        }
        if config.lower_threshold > config.upper_threshold {
            warn!(
                lower = %config.lower_threshold,
                upper = %config.upper_threshold,
                "Signal thresholds are inverted, using defaults"
            );
            config.lower_threshold = Decimal::from(DEFAULT_LOWER_THRESHOLD);
            config.upper_threshold = Decimal::from(DEFAULT_UPPER_THRESHOLD);
        }

        config
    }

    pub fn is_production(&self) -> bool {
        is_production_environment(&self.environment)
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr,
{
    match raw {
        Some(value) => value.parse().unwrap_or_else(|_| {
            warn!(key = key, value = %value, "Invalid value for {}, using default", key);
            default
        }),
        None => default,
    }
}
