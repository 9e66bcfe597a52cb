//! Configuration module for the congestion sync backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_FEED_CAPACITY: usize = 1024;
const DEFAULT_HISTORY_LIMIT: i64 = 10;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Optional JSON fixture loaded into an empty database at startup
    pub seed_path: Option<PathBuf>,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Buffered events per change feed subscriber before it starts lagging
    pub feed_capacity: usize,
    /// Default number of rows returned by status history queries
    pub history_limit: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_psk = env::var("CONGESTION_API_PSK").ok().filter(|k| !k.is_empty());

        let db_path = env::var("CONGESTION_DB_PATH")
            .unwrap_or_else(|_| "./data/congestion.sqlite".to_string())
            .into();

        let seed_path = env::var("CONGESTION_SEED_PATH").ok().map(PathBuf::from);

        let bind_addr = parse_or_default("CONGESTION_BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080)));

        let log_level = env::var("CONGESTION_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let feed_capacity = parse_or_default("CONGESTION_FEED_CAPACITY", Some(DEFAULT_FEED_CAPACITY))
            .filter(|c| *c > 0)
            .unwrap_or(DEFAULT_FEED_CAPACITY);

        let history_limit = parse_or_default("CONGESTION_HISTORY_LIMIT", Some(DEFAULT_HISTORY_LIMIT))
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_HISTORY_LIMIT);

        Self {
            api_psk,
            db_path,
            seed_path,
            bind_addr,
            log_level,
            feed_capacity,
            history_limit,
        }
    }
}

/// Parse an environment variable, keeping the default when it is unset or malformed.
fn parse_or_default<T: std::str::FromStr>(key: &str, default: Option<T>) -> Option<T> {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const KEYS: [&str; 7] = [
        "CONGESTION_API_PSK",
        "CONGESTION_DB_PATH",
        "CONGESTION_SEED_PATH",
        "CONGESTION_BIND_ADDR",
        "CONGESTION_LOG_LEVEL",
        "CONGESTION_FEED_CAPACITY",
        "CONGESTION_HISTORY_LIMIT",
    ];

    fn clear_env() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_default_config() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let config = Config::from_env();

        assert!(config.api_psk.is_none());
        assert!(config.seed_path.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/congestion.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.feed_capacity, 1024);
        assert_eq!(config.history_limit, 10);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("CONGESTION_BIND_ADDR", "not-an-address");
        env::set_var("CONGESTION_FEED_CAPACITY", "0");
        env::set_var("CONGESTION_HISTORY_LIMIT", "many");
        env::set_var("CONGESTION_API_PSK", "");

        let config = Config::from_env();
        clear_env();

        assert!(config.api_psk.is_none());
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.feed_capacity, 1024);
        assert_eq!(config.history_limit, 10);
    }

    #[test]
    fn test_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("CONGESTION_API_PSK", "secret");
        env::set_var("CONGESTION_SEED_PATH", "./seed.json");
        env::set_var("CONGESTION_HISTORY_LIMIT", "25");

        let config = Config::from_env();
        clear_env();

        assert_eq!(config.api_psk.as_deref(), Some("secret"));
        assert_eq!(config.seed_path, Some(PathBuf::from("./seed.json")));
        assert_eq!(config.history_limit, 25);
    }
}
