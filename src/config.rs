use std::fmt;
use std::time::Duration;

/// Startup configuration errors. These are the only fatal errors in the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    MissingToken,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingToken => write!(f, "DISCORD_BOT_TOKEN is required"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// A request budget for one rate-limit tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    pub capacity: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub port: u16,
    pub bind_addr: String,
    pub dispatch_timeout: Duration,
    pub presence_activity: String,
    pub ping_command: bool,
    pub api_rate_limit: RateLimitConfig,
    pub send_rate_limit: RateLimitConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var("DISCORD_BOT_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        Ok(Self {
            token,
            port: parse_env("PORT", 3000),
            bind_addr: std::env::var("RELAY_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
            dispatch_timeout: Duration::from_secs(parse_env("RELAY_DISPATCH_TIMEOUT_SECS", 5)),
            presence_activity: std::env::var("RELAY_PRESENCE_ACTIVITY")
                .unwrap_or_else(|_| "with the API".to_string()),
            ping_command: std::env::var("RELAY_PING_COMMAND")
                .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
                .unwrap_or(true),
            api_rate_limit: RateLimitConfig {
                capacity: parse_env("RELAY_API_RATE_LIMIT", 100),
                window_secs: parse_env("RELAY_API_RATE_WINDOW_SECS", 15 * 60),
            },
            send_rate_limit: RateLimitConfig {
                capacity: parse_env("RELAY_SEND_RATE_LIMIT", 10),
                window_secs: parse_env("RELAY_SEND_RATE_WINDOW_SECS", 60),
            },
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
