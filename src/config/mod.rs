use serde_derive::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 65525;
pub const MIN_PORT: u16 = 1024;
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_MAX_CONNECTIONS: usize = 16;
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io error happened: {0}")]
    IoError(#[from] std::io::Error),
    #[error("config yaml error happened: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("port {0} is outside of 1024..=65535")]
    InvalidPort(u16),
    #[error("timeout must be greater than 0")]
    InvalidTimeout,
    #[error("max connections must be greater than 0")]
    InvalidMaxConnections,
    #[error("ip range {0} - {1} ends before it starts")]
    InvalidIpRange(Ipv4Addr, Ipv4Addr),
    #[error("port range {0} - {1} ends before it starts")]
    InvalidPortRange(u16, u16),
    #[error("at least one {0} range is required")]
    MissingRanges(&'static str),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct IpRange {
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
}

impl IpRange {
    pub fn new(start: Ipv4Addr, end: Ipv4Addr) -> Self {
        Self { start, end }
    }

    /// Every address of the range, both ends included.
    pub fn addresses(&self) -> impl Iterator<Item = Ipv4Addr> {
        (u32::from(self.start)..=u32::from(self.end)).map(Ipv4Addr::from)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub fn ports(&self) -> RangeInclusive<u16> {
        self.start..=self.end
    }
}

fn default_heartbeat_interval() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_SECS
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NodeConfig {
    pub ip: Ipv4Addr,
    pub port: u16,
    pub timeout_ms: u64,
    pub max_connections: usize,
    pub scan_ip_ranges: Vec<IpRange>,
    pub scan_port_ranges: Vec<PortRange>,
    pub db: PathBuf,
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
}

impl NodeConfig {
    /// Defaults used by `banknode init`: scan the /24 around `ip` on the
    /// ten ports following `port`.
    pub fn new(ip: Ipv4Addr, port: u16, db: PathBuf) -> Self {
        let [a, b, c, _] = ip.octets();
        Self {
            ip,
            port,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            scan_ip_ranges: vec![IpRange::new(
                Ipv4Addr::new(a, b, c, 1),
                Ipv4Addr::new(a, b, c, 254),
            )],
            scan_port_ranges: vec![PortRange::new(port, port.saturating_add(10))],
            db,
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_INTERVAL_SECS,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let conf: NodeConfig = serde_yaml::from_str(&std::fs::read_to_string(path)?)?;
        conf.validate()?;
        Ok(conf)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port < MIN_PORT {
            return Err(ConfigError::InvalidPort(self.port));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections);
        }
        if self.scan_ip_ranges.is_empty() {
            return Err(ConfigError::MissingRanges("ip"));
        }
        if self.scan_port_ranges.is_empty() {
            return Err(ConfigError::MissingRanges("port"));
        }
        for r in self.scan_ip_ranges.iter() {
            if r.end < r.start {
                return Err(ConfigError::InvalidIpRange(r.start, r.end));
            }
        }
        for r in self.scan_port_ranges.iter() {
            if r.start < MIN_PORT {
                return Err(ConfigError::InvalidPort(r.start));
            }
            if r.end < r.start {
                return Err(ConfigError::InvalidPortRange(r.start, r.end));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_secs > 0).then(|| Duration::from_secs(self.heartbeat_interval_secs))
    }

    /// Every configured port once, in range order.
    pub fn candidate_ports(&self) -> Vec<u16> {
        let mut seen = std::collections::HashSet::new();
        self.scan_port_ranges
            .iter()
            .flat_map(|r| r.ports())
            .filter(|p| seen.insert(*p))
            .collect()
    }

    /// Port used to tell whether a host is up at all.
    pub fn probe_port(&self) -> Option<u16> {
        self.scan_port_ranges.first().map(|r| r.start)
    }
}
