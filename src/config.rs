use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::http::path::merge;

/// Runtime configuration, built once at startup and shared read-only.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory all servable files live under.
    pub root_path: String,
    /// Served for `/` and empty request paths.
    pub default_document: String,
    /// Fallback page, relative to `root_path`, served for any missing target.
    pub captive_document: String,
    pub bind_ip: Ipv4Addr,
    pub http_port: u16,
    pub dns_port: u16,
    /// Skips interface discovery when set.
    pub portal_address: Option<Ipv4Addr>,
    /// Client-side interface, preferred when it has an IPv4 address.
    pub station_interface: String,
    pub access_point_interface: String,
    pub chunk_size: usize,
    pub dns_poll_interval_ms: u64,
    pub dns_ttl: u32,
    pub client_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_path: "/wwwroot".to_string(),
            default_document: "index.html".to_string(),
            captive_document: "captive.html".to_string(),
            bind_ip: Ipv4Addr::UNSPECIFIED,
            http_port: 80,
            dns_port: 53,
            portal_address: None,
            station_interface: "wlan0".to_string(),
            access_point_interface: "ap0".to_string(),
            chunk_size: 512,
            dns_poll_interval_ms: 300,
            dns_ttl: 60,
            client_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Defaults with the three settings a caller usually picks.
    pub fn new(
        root_path: impl Into<String>,
        default_document: impl Into<String>,
        http_port: u16,
    ) -> Self {
        Self {
            root_path: root_path.into(),
            default_document: default_document.into(),
            http_port,
            ..Self::default()
        }
    }

    /// Loads defaults, then the YAML file named by `CAPTIVE_CONFIG`, then
    /// individual `CAPTIVE_*` environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("CAPTIVE_CONFIG") {
            Ok(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config file {}", path))?;
                Self::from_yaml(&text)?
            }
            Err(_) => Self::default(),
        };

        if let Ok(v) = std::env::var("CAPTIVE_ROOT") {
            cfg.root_path = v;
        }
        if let Ok(v) = std::env::var("CAPTIVE_DEFAULT_DOCUMENT") {
            cfg.default_document = v;
        }
        if let Ok(v) = std::env::var("CAPTIVE_REDIRECT") {
            cfg.captive_document = v;
        }
        if let Ok(v) = std::env::var("CAPTIVE_HTTP_PORT") {
            cfg.http_port = v.parse().context("CAPTIVE_HTTP_PORT")?;
        }
        if let Ok(v) = std::env::var("CAPTIVE_DNS_PORT") {
            cfg.dns_port = v.parse().context("CAPTIVE_DNS_PORT")?;
        }
        if let Ok(v) = std::env::var("CAPTIVE_STATION_IF") {
            cfg.station_interface = v;
        }
        if let Ok(v) = std::env::var("CAPTIVE_AP_IF") {
            cfg.access_point_interface = v;
        }
        if let Ok(v) = std::env::var("CAPTIVE_ADDRESS") {
            cfg.portal_address = Some(v.parse().context("CAPTIVE_ADDRESS")?);
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_yaml::from_str(text).context("parsing YAML config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than zero");
        }
        if self.default_document.is_empty() {
            anyhow::bail!("default_document must not be empty");
        }
        Ok(())
    }

    /// Physical path of the captive-redirect resource.
    pub fn captive_path(&self) -> String {
        merge(&[self.root_path.as_str(), self.captive_document.as_str()])
    }

    pub fn dns_poll_interval(&self) -> Duration {
        Duration::from_millis(self.dns_poll_interval_ms)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }
}
