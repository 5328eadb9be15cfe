//! Configuration loading and validation.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ConfigError, Result, ValidationError};

/// Rule-list path used when none is configured. When this file does not
/// exist the bundled list is served instead.
pub const DEFAULT_GFWLIST_PATH: &str = "gfwlist.txt";

/// Main configuration for the PAC server.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Address the HTTP server listens on.
    #[serde(
        default = "default_listen",
        deserialize_with = "deserialize_socket_addr"
    )]
    pub listen: SocketAddr,

    /// Proxy directive returned for proxied hosts, inserted verbatim into
    /// the script (e.g. `"SOCKS5 127.0.0.1:1080; DIRECT"`).
    #[serde(default = "default_proxy")]
    pub proxy: String,

    /// Path to the gfwlist file (base64 or plain text).
    #[serde(default = "default_gfwlist")]
    pub gfwlist: PathBuf,

    /// Optional path to a custom rule list in the same grammar.
    pub custom: Option<PathBuf>,

    /// Optional JavaScript spliced into `FindProxyForURL` before the table
    /// lookups.
    pub custom_snippet: Option<String>,

    /// Prometheus metrics exporter.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metrics exporter settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Expose a `/metrics` endpoint.
    #[serde(default)]
    pub enabled: bool,

    /// Address of the metrics endpoint.
    #[serde(
        default = "default_metrics_listen",
        deserialize_with = "deserialize_socket_addr"
    )]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            proxy: default_proxy(),
            gfwlist: default_gfwlist(),
            custom: None,
            custom_snippet: None,
            metrics: MetricsConfig::default(),
        }
    }
}

const fn default_listen() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 1080))
}

const fn default_metrics_listen() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 9090))
}

fn default_proxy() -> String {
    "PROXY 127.0.0.1:3128".to_string()
}

fn default_gfwlist() -> PathBuf {
    PathBuf::from(DEFAULT_GFWLIST_PATH)
}

fn deserialize_socket_addr<'de, D>(deserializer: D) -> std::result::Result<SocketAddr, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Called by [`parse`](Self::parse); call it again after applying
    /// command-line overrides.
    pub fn validate(&self) -> Result<()> {
        validate_proxy(&self.proxy).map_err(ConfigError::from)?;

        if self.gfwlist.as_os_str().is_empty() {
            return Err(ConfigError::from(ValidationError::EmptyGfwlistPath).into());
        }

        if let Some(custom) = &self.custom
            && custom.as_os_str().is_empty()
        {
            return Err(ConfigError::from(ValidationError::EmptyCustomPath).into());
        }

        Ok(())
    }

    /// Whether the gfwlist path is the default one, which enables the
    /// bundled fallback list.
    #[must_use]
    pub fn uses_default_gfwlist(&self) -> bool {
        self.gfwlist == Path::new(DEFAULT_GFWLIST_PATH)
    }
}

/// Check that a proxy directive can be embedded in a JavaScript string
/// literal as-is.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyProxy`] for a blank directive and
/// [`ValidationError::InvalidProxy`] if it contains `"`, `\` or a line break.
pub fn validate_proxy(proxy: &str) -> std::result::Result<(), ValidationError> {
    if proxy.trim().is_empty() {
        return Err(ValidationError::EmptyProxy);
    }
    if proxy.contains(['"', '\\', '\n', '\r']) {
        return Err(ValidationError::InvalidProxy {
            proxy: proxy.to_string(),
        });
    }
    Ok(())
}
