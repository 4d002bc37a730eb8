//! Registry server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse configuration.
    #[error("configuration error: {0}")]
    Parse(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Registry server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    /// Socket configuration.
    #[serde(default)]
    pub server: ServerSettings,

    /// Lease expiry configuration.
    #[serde(default)]
    pub lease: LeaseSettings,
}

impl RegistryConfig {
    /// Load configuration from file and environment.
    ///
    /// Sources, later overriding earlier:
    /// 1. Default values
    /// 2. `waypoint.toml` in the current directory (if present)
    /// 3. Specified config file path (if provided)
    /// 4. Environment variables with `WAYPOINT_` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Toml::file("waypoint.toml"));

        if let Some(p) = path {
            figment = figment.merge(Toml::file(p));
        }

        figment
            .merge(Env::prefixed("WAYPOINT_").split("__"))
            .extract()
            .map_err(ConfigError::from)
    }
}

/// Socket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// TCP address the registry listens on.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

const fn default_listen() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5000)
}

/// Lease expiry settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LeaseSettings {
    /// How long an entry lives without a renewal.
    #[serde(default = "default_lease_time", deserialize_with = "duration")]
    pub lease_time: Duration,

    /// How often expired entries are swept.
    #[serde(default = "default_expiry_interval", deserialize_with = "duration")]
    pub expiry_interval: Duration,
}

impl Default for LeaseSettings {
    fn default() -> Self {
        Self {
            lease_time: default_lease_time(),
            expiry_interval: default_expiry_interval(),
        }
    }
}

const fn default_lease_time() -> Duration {
    Duration::from_secs(240)
}

const fn default_expiry_interval() -> Duration {
    Duration::from_secs(60)
}

/// Deserialize a duration from strings like `500ms`, `30s` or `5m`.
fn duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    let (value, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => s.split_at(idx),
        None => (s, "s"),
    };

    let value: u64 = value
        .parse()
        .map_err(|_| format!("invalid duration: {s}"))?;

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        _ => Err(format!("invalid duration unit: {s}")),
    }
}
