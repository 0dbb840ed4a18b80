use super::*;
use crate::config::{IpRange, NodeConfig};
use std::io::ErrorKind;

/// Sweeps the configured address ranges for hosts that are up.
pub struct HostScanner {
    ranges: Vec<IpRange>,
    probe_port: Option<u16>,
    timeout: Duration,
}

impl HostScanner {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            ranges: config.scan_ip_ranges.clone(),
            probe_port: config.probe_port(),
            timeout: config.timeout(),
        }
    }

    /// Probes every address at once and returns the responding ones in
    /// range order.
    pub async fn scan_network(&self) -> Vec<Ipv4Addr> {
        let probe_port = match self.probe_port {
            Some(port) => port,
            None => {
                log::warn!("No port ranges configured, skipping network scan");
                return Vec::new();
            }
        };
        let addrs = self
            .ranges
            .iter()
            .flat_map(|r| r.addresses())
            .collect::<Vec<_>>();
        log::info!("Scanning {} addresses", addrs.len());

        let alive = group_request(&addrs, |ip| self.probe(ip, probe_port))
            .await
            .into_iter()
            .filter_map(|(ip, up)| up.then(|| ip))
            .collect::<Vec<_>>();
        log::info!("Network scan found {} active hosts", alive.len());
        alive
    }

    // Both an accepted connection and an explicit refusal mean the host answered.
    async fn probe(&self, ip: Ipv4Addr, port: u16) -> bool {
        match connect(SocketAddr::from((ip, port)), self.timeout).await {
            Ok(_) => true,
            Err(NetError::IoError(e)) if e.kind() == ErrorKind::ConnectionRefused => true,
            Err(e) => {
                log::trace!("Host {} did not answer: {}", ip, e);
                false
            }
        }
    }
}
