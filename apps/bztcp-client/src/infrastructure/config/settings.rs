//! Client Configuration Settings
//!
//! Configuration types for the BZTCP client, loaded from environment variables.

use std::time::Duration;

use crate::infrastructure::bztcp::auth::Credentials;
use crate::infrastructure::bztcp::keepalive::{DEFAULT_PING_INTERVAL, KeepAliveConfig};
use crate::infrastructure::bztcp::messages::TIME_FORMAT;

/// Default server address.
pub const DEFAULT_ADDR: &str = "tcp-v1.benzinga.io:11337";

/// Default bound on opening the transport.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on the READY/AUTH exchange.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Session configuration.
///
/// Each session owns its copy; nothing here is process-global.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address as `host:port`.
    pub addr: String,
    /// Account credentials.
    pub credentials: Credentials,
    /// Wrap the connection in TLS.
    pub tls: bool,
    /// Bound on TCP connect plus TLS handshake.
    pub connect_timeout: Duration,
    /// Bound on the READY/AUTH exchange.
    pub auth_timeout: Duration,
    /// Period between keep-alive pings.
    pub ping_interval: Duration,
    /// chrono layout for outgoing timestamps.
    pub timestamp_layout: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            credentials: Credentials::new("", ""),
            tls: false,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            ping_interval: DEFAULT_PING_INTERVAL,
            timestamp_layout: TIME_FORMAT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Default configuration with the given credentials.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            ..Self::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `BZTCP_USER` or `BZTCP_KEY` is missing or empty, or
    /// if a timeout or the ping interval is set to zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = required(&lookup, "BZTCP_USER")?;
        let key = required(&lookup, "BZTCP_KEY")?;
        let defaults = Self::default();

        Ok(Self {
            addr: lookup("BZTCP_ADDR")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.addr),
            credentials: Credentials::new(username, key),
            tls: lookup("BZTCP_TLS").map_or(defaults.tls, |v| parse_bool(&v)),
            connect_timeout: duration_secs(
                &lookup,
                "BZTCP_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout,
            )?,
            auth_timeout: duration_secs(&lookup, "BZTCP_AUTH_TIMEOUT_SECS", defaults.auth_timeout)?,
            ping_interval: duration_secs(
                &lookup,
                "BZTCP_PING_INTERVAL_SECS",
                defaults.ping_interval,
            )?,
            timestamp_layout: defaults.timestamp_layout,
        })
    }

    /// Keep-alive settings derived from this configuration.
    #[must_use]
    pub fn keepalive(&self) -> KeepAliveConfig {
        KeepAliveConfig {
            ping_interval: self.ping_interval,
            timestamp_layout: self.timestamp_layout.clone(),
        }
    }
}

/// Process-level settings for the `bztcp` binary.
#[derive(Debug, Clone, Default)]
pub struct RuntimeSettings {
    /// Debug-level logging.
    pub verbose: bool,
    /// Prometheus exporter port (0 = disabled).
    pub metrics_port: u16,
}

impl RuntimeSettings {
    /// Read `BZTCP_VERBOSE` and `BZTCP_METRICS_PORT`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings from an arbitrary variable source.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            verbose: lookup("BZTCP_VERBOSE").is_some_and(|v| parse_bool(&v)),
            metrics_port: lookup("BZTCP_METRICS_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Duration variable is set to zero.
    #[error("environment variable {0} must be greater than zero")]
    ZeroDuration(String),
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
    if value.is_empty() {
        return Err(ConfigError::EmptyValue(key.to_string()));
    }
    Ok(value)
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Whole seconds from `key`; unparsable values fall back to `default`.
fn duration_secs<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).and_then(|v| v.trim().parse::<u64>().ok()) {
        Some(0) => Err(ConfigError::ZeroDuration(key.to_string())),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_protocol_constants() {
        let config = ClientConfig::default();
        assert_eq!(config.addr, "tcp-v1.benzinga.io:11337");
        assert!(!config.tls);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.auth_timeout, Duration::from_secs(10));
        assert_eq!(config.ping_interval, Duration::from_secs(20));
        assert_eq!(config.timestamp_layout, TIME_FORMAT);
    }

    #[test]
    fn requires_user_and_key() {
        let err = ClientConfig::from_lookup(lookup(&[("BZTCP_KEY", "k")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "BZTCP_USER"));

        let err = ClientConfig::from_lookup(lookup(&[("BZTCP_USER", "u"), ("BZTCP_KEY", "")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyValue(ref v) if v == "BZTCP_KEY"));
    }

    #[test]
    fn reads_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("BZTCP_USER", "bztest"),
            ("BZTCP_KEY", "12345"),
            ("BZTCP_ADDR", "localhost:9000"),
            ("BZTCP_TLS", "true"),
            ("BZTCP_AUTH_TIMEOUT_SECS", "3"),
            ("BZTCP_PING_INTERVAL_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.addr, "localhost:9000");
        assert_eq!(config.credentials.username(), "bztest");
        assert_eq!(config.credentials.key(), "12345");
        assert!(config.tls);
        assert_eq!(config.auth_timeout, Duration::from_secs(3));
        assert_eq!(config.ping_interval, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.keepalive().ping_interval, Duration::from_secs(5));
    }

    #[test]
    fn unparsable_values_fall_back_to_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("BZTCP_USER", "u"),
            ("BZTCP_KEY", "k"),
            ("BZTCP_ADDR", ""),
            ("BZTCP_PING_INTERVAL_SECS", "soon"),
        ]))
        .unwrap();
        assert_eq!(config.addr, DEFAULT_ADDR);
        assert_eq!(config.ping_interval, DEFAULT_PING_INTERVAL);
    }

    #[test]
    fn zero_durations_are_rejected() {
        for key in [
            "BZTCP_PING_INTERVAL_SECS",
            "BZTCP_CONNECT_TIMEOUT_SECS",
            "BZTCP_AUTH_TIMEOUT_SECS",
        ] {
            let err = ClientConfig::from_lookup(lookup(&[
                ("BZTCP_USER", "u"),
                ("BZTCP_KEY", "k"),
                (key, "0"),
            ]))
            .unwrap_err();
            assert!(matches!(err, ConfigError::ZeroDuration(ref v) if v == key));
        }
    }

    #[test]
    fn debug_redacts_key() {
        let config = ClientConfig::new(Credentials::new("u", "secret456"));
        assert!(!format!("{config:?}").contains("secret456"));
    }

    #[test]
    fn runtime_settings() {
        let settings = RuntimeSettings::from_lookup(lookup(&[
            ("BZTCP_VERBOSE", "1"),
            ("BZTCP_METRICS_PORT", "9090"),
        ]));
        assert!(settings.verbose);
        assert_eq!(settings.metrics_port, 9090);

        let settings = RuntimeSettings::from_lookup(lookup(&[]));
        assert!(!settings.verbose);
        assert_eq!(settings.metrics_port, 0);
    }
}
