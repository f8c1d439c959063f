//! Configuration and Environment Management
//!
//! All settings come from environment variables (a `.env` file is loaded by
//! the binary before this runs). Malformed values are rejected instead of
//! silently falling back to defaults.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::core::error::ConfigError;

const DEFAULT_SERVER_NAME: &str = "GPT Integration Tools";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SSE_PING_INTERVAL_SECS: u64 = 30;
const MAX_DEFAULT_WORKERS: usize = 16;
/// Upper bound for second-valued settings (one day).
const MAX_DURATION_SECS: u64 = 86_400;

/// Which transports the process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Http,
    Stdio,
    Both,
}

impl FromStr for TransportMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Self::Http),
            "stdio" => Ok(Self::Stdio),
            "both" => Ok(Self::Both),
            other => Err(ConfigError::InvalidTransport(other.to_string())),
        }
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server name as reported in MCP initialize responses
    pub server_name: String,
    /// Server version string as reported in MCP initialize responses
    pub server_version: String,
    pub transport: TransportMode,
    pub host: String,
    pub port: u16,
    pub workers: usize,
    /// Deadline for a single request before it is answered with 504.
    pub request_timeout: Duration,
    /// Period between SSE keep-alive pings.
    pub sse_ping_interval: Duration,
    /// JSON file served by `GET /manifest`.
    pub manifest_path: PathBuf,
    /// Directory served by `GET /widget/{name}`.
    pub widget_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_name: DEFAULT_SERVER_NAME.to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            transport: TransportMode::Http,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            workers: default_workers(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            sse_ping_interval: Duration::from_secs(DEFAULT_SSE_PING_INTERVAL_SECS),
            manifest_path: PathBuf::from("app_manifest.json"),
            widget_dir: PathBuf::from("components"),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// - `SERVER_NAME`, `SERVER_VERSION`: reported in `serverInfo`
    /// - `MCP_TRANSPORT_MODE`: `http` (default), `stdio` or `both`
    /// - `HOST`, `PORT`: bind address (default `0.0.0.0:8000`)
    /// - `WORKER_THREADS`: actix workers (default: CPU count, max 16)
    /// - `REQUEST_TIMEOUT_SECS`: per-request deadline (default 10, at most 86400)
    /// - `SSE_PING_INTERVAL_SECS`: keep-alive period (default 30, at most 86400)
    /// - `APP_MANIFEST_PATH`, `WIDGET_DIR`: static file locations
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let transport = match lookup("MCP_TRANSPORT_MODE") {
            Some(mode) => mode.parse()?,
            None => defaults.transport,
        };

        Ok(Self {
            server_name: lookup("SERVER_NAME").unwrap_or(defaults.server_name),
            server_version: lookup("SERVER_VERSION").unwrap_or(defaults.server_version),
            transport,
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            workers: parse_var(&lookup, "WORKER_THREADS")?.unwrap_or(defaults.workers),
            request_timeout: parse_secs(&lookup, "REQUEST_TIMEOUT_SECS")?
                .unwrap_or(defaults.request_timeout),
            sse_ping_interval: parse_secs(&lookup, "SSE_PING_INTERVAL_SECS")?
                .unwrap_or(defaults.sse_ping_interval),
            manifest_path: lookup("APP_MANIFEST_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.manifest_path),
            widget_dir: lookup("WIDGET_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.widget_dir),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse an optional numeric variable. Zero is rejected along with garbage.
fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialEq + Default,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(v) if v != T::default() => Ok(Some(v)),
            _ => Err(ConfigError::InvalidNumber { var, value: raw }),
        },
    }
}

/// Parse an optional duration in whole seconds, in `1..=MAX_DURATION_SECS`.
fn parse_secs<F>(lookup: &F, var: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_var::<F, u64>(lookup, var)? {
        Some(secs) if secs > MAX_DURATION_SECS => Err(ConfigError::InvalidNumber {
            var,
            value: secs.to_string(),
        }),
        secs => Ok(secs.map(Duration::from_secs)),
    }
}

fn default_workers() -> usize {
    num_cpus::get().clamp(1, MAX_DEFAULT_WORKERS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.transport, TransportMode::Http);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.sse_ping_interval, Duration::from_secs(30));
        assert_eq!(config.server_name, "GPT Integration Tools");
        assert!(config.workers >= 1 && config.workers <= 16);
    }

    #[test]
    fn reads_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9100"),
            ("MCP_TRANSPORT_MODE", "both"),
            ("SSE_PING_INTERVAL_SECS", "5"),
            ("WIDGET_DIR", "/srv/widgets"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:9100");
        assert_eq!(config.transport, TransportMode::Both);
        assert_eq!(config.sse_ping_interval, Duration::from_secs(5));
        assert_eq!(config.widget_dir, PathBuf::from("/srv/widgets"));
    }

    #[test]
    fn rejects_malformed_port() {
        let err = ServerConfig::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber { var: "PORT", value: "eighty".to_string() }
        );
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = ServerConfig::from_lookup(lookup_from(&[("REQUEST_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { var: "REQUEST_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn rejects_intervals_longer_than_a_day() {
        let err = ServerConfig::from_lookup(lookup_from(&[(
            "SSE_PING_INTERVAL_SECS",
            "18446744073709551615",
        )]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                var: "SSE_PING_INTERVAL_SECS",
                value: "18446744073709551615".to_string()
            }
        );

        let err = ServerConfig::from_lookup(lookup_from(&[("REQUEST_TIMEOUT_SECS", "86401")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { var: "REQUEST_TIMEOUT_SECS", .. }));

        let config = ServerConfig::from_lookup(lookup_from(&[("SSE_PING_INTERVAL_SECS", "86400")]))
            .unwrap();
        assert_eq!(config.sse_ping_interval, Duration::from_secs(86_400));
    }

    #[test]
    fn rejects_zero_workers() {
        let err = ServerConfig::from_lookup(lookup_from(&[("WORKER_THREADS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { var: "WORKER_THREADS", .. }));
    }

    #[test]
    fn rejects_unknown_transport() {
        let err = ServerConfig::from_lookup(lookup_from(&[("MCP_TRANSPORT_MODE", "carrier-pigeon")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidTransport("carrier-pigeon".to_string()));
    }
}
