//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::game::{DesyncPolicy, MatchConfig, UnitKind};
use crate::relay::RelayMode;
use crate::util::time::{DEFAULT_TICK_RATE, MAX_TICK_RATE};

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Relay binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,

    /// How the relay routes messages between connections
    pub relay_mode: RelayMode,
    /// Outbound queue size per relay connection
    pub peer_buffer: usize,
    /// New connections accepted per second
    pub join_rate_limit: u32,
    /// Directory served at `/` (browser client), if any
    pub static_dir: Option<PathBuf>,
    /// Allowed client origins for CORS (comma-separated), if any
    pub client_origin: Option<String>,

    /// Relay WebSocket URL used by peers
    pub relay_url: String,
    /// Peer simulation ticks per second
    pub tick_rate: u32,
    pub desync_policy: DesyncPolicy,
    pub unit_kind: UnitKind,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // PORT wins over SERVER_ADDR (hosting platforms set it)
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(ConfigError::invalid("LOG_FORMAT", other)),
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,

            relay_mode: parse_enum(&lookup, "RELAY_MODE")?.unwrap_or_default(),
            peer_buffer: parse_number(&lookup, "PEER_BUFFER")?.unwrap_or(256),
            join_rate_limit: parse_number(&lookup, "JOIN_RATE_LIMIT")?.unwrap_or(5),
            static_dir: lookup("STATIC_DIR").map(PathBuf::from),
            client_origin: lookup("CLIENT_ORIGIN"),

            relay_url: lookup("RELAY_URL")
                .unwrap_or_else(|| "ws://127.0.0.1:3000/ws".to_string()),
            tick_rate: parse_tick_rate(&lookup)?,
            desync_policy: parse_enum(&lookup, "DESYNC_POLICY")?.unwrap_or_default(),
            unit_kind: parse_enum(&lookup, "UNIT_KIND")?.unwrap_or_default(),
        })
    }

    /// Match settings for a peer
    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            unit_kind: self.unit_kind,
            desync_policy: self.desync_policy,
            ..MatchConfig::default()
        }
    }
}

fn parse_number<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::invalid(key, &raw)),
    }
}

/// Peer ticks per second, bounded so the tick period stays non-zero
fn parse_tick_rate<F>(lookup: &F) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_number(lookup, "TICK_RATE")? {
        None => Ok(DEFAULT_TICK_RATE),
        Some(rate) if (1..=MAX_TICK_RATE).contains(&rate) => Ok(rate),
        Some(rate) => Err(ConfigError::invalid("TICK_RATE", &rate.to_string())),
    }
}

/// Parse a snake_case enum value through serde
fn parse_enum<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: serde::de::DeserializeOwned,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => {
            let normalized = raw.trim().to_ascii_lowercase();
            serde_json::from_value(serde_json::Value::String(normalized))
                .map(Some)
                .map_err(|_| ConfigError::invalid(key, &raw))
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("Invalid server address format")]
    InvalidAddress,
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.relay_mode, RelayMode::Paired);
        assert_eq!(config.peer_buffer, 256);
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.desync_policy, DesyncPolicy::Ignore);
        assert_eq!(config.unit_kind, UnitKind::Light);
        assert!(config.static_dir.is_none());
    }

    #[test]
    fn test_port_overrides_server_addr() {
        let config = load(&[("PORT", "4000"), ("SERVER_ADDR", "127.0.0.1:9000")]).unwrap();
        assert_eq!(config.server_addr.port(), 4000);
    }

    #[test]
    fn test_enum_values() {
        let config = load(&[
            ("RELAY_MODE", "Broadcast"),
            ("DESYNC_POLICY", "apply"),
            ("UNIT_KIND", "heavy"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(config.relay_mode, RelayMode::Broadcast);
        assert_eq!(config.desync_policy, DesyncPolicy::Apply);
        assert_eq!(config.unit_kind, UnitKind::Heavy);
        assert_eq!(config.log_format, LogFormat::Json);

        let match_config = config.match_config();
        assert_eq!(match_config.unit_kind, UnitKind::Heavy);
        assert_eq!(match_config.desync_policy, DesyncPolicy::Apply);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("TICK_RATE", "fast")]),
            Err(ConfigError::Invalid { key: "TICK_RATE", .. })
        ));
        assert!(matches!(
            load(&[("TICK_RATE", "0")]),
            Err(ConfigError::Invalid { key: "TICK_RATE", .. })
        ));
        assert!(matches!(
            load(&[("TICK_RATE", "2000000")]),
            Err(ConfigError::Invalid { key: "TICK_RATE", .. })
        ));
        assert_eq!(load(&[("TICK_RATE", "1000")]).unwrap().tick_rate, 1000);
        assert!(matches!(
            load(&[("RELAY_MODE", "mesh")]),
            Err(ConfigError::Invalid { key: "RELAY_MODE", .. })
        ));
        assert!(matches!(
            load(&[("SERVER_ADDR", "nowhere")]),
            Err(ConfigError::InvalidAddress)
        ));
    }
}
