//! Runtime settings read from the environment.

use std::str::FromStr;
use std::time::Duration;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 5000;

/// Server configuration.
///
/// Every field has a default and can be overridden by an environment
/// variable: `HOST`, `PORT`, `RUST_LOG`, and `COMMAND_TIMEOUT_MS` (how long
/// a command waits for its per-order execution slot before giving up).
/// Unparseable values fall back to the default rather than aborting startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub command_timeout_ms: u64,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

fn env_or_str(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_or_str("HOST", DEFAULT_HOST),
            port: env_or("PORT", DEFAULT_PORT),
            log_level: env_or_str("RUST_LOG", DEFAULT_LOG_LEVEL),
            command_timeout_ms: env_or("COMMAND_TIMEOUT_MS", DEFAULT_COMMAND_TIMEOUT_MS),
        }
    }

    /// `"host:port"` string for the TCP listener.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Per-order command slot timeout.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
        }
    }
}
