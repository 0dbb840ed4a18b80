use super::*;
use futures::stream::{FuturesUnordered, StreamExt};

/// Finds the port a bank node listens on by racing a `BC` handshake
/// against every candidate port.
#[derive(Debug, Clone, Copy)]
pub struct PeerLocator {
    timeout: Duration,
}

impl PeerLocator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Returns the first port whose listener answers `BC <ip>`, or `None`
    /// when no candidate does. Attempts still running at that point are
    /// dropped.
    pub async fn find_port(&self, ip: Ipv4Addr, candidate_ports: &[u16]) -> Option<u16> {
        let mut attempts = candidate_ports
            .iter()
            .map(|port| self.try_port(ip, *port))
            .collect::<FuturesUnordered<_>>();
        while let Some(result) = attempts.next().await {
            if let Some(port) = result {
                log::debug!("Bank node {} found on port {}", ip, port);
                return Some(port);
            }
        }
        log::debug!("No bank node answered on {}", ip);
        None
    }

    async fn try_port(&self, ip: Ipv4Addr, port: u16) -> Option<u16> {
        match self.handshake(ip, port).await {
            Ok(true) => Some(port),
            Ok(false) => None,
            Err(e) => {
                log::trace!("Handshake with {}:{} failed: {}", ip, port, e);
                None
            }
        }
    }

    async fn handshake(&self, ip: Ipv4Addr, port: u16) -> Result<bool, NetError> {
        let stream = connect(SocketAddr::from((ip, port)), self.timeout).await?;
        let response = request_line(stream, "BC", self.timeout).await?;
        Ok(is_bank_code_of(&response, ip))
    }
}

/// A peer is only accepted when it reports exactly the address we dialed.
pub fn is_bank_code_of(response: &str, ip: Ipv4Addr) -> bool {
    response == format!("BC {}", ip)
}
