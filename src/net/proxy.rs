use super::*;
use crate::config::NodeConfig;

/// Relays request lines to the bank node running on another host.
///
/// The port is looked up once when the proxy is created and reused for
/// every request sent through it.
#[derive(Debug, Clone)]
pub struct PeerProxy {
    ip: Ipv4Addr,
    port: Option<u16>,
    timeout: Duration,
}

impl PeerProxy {
    pub async fn connect(ip: Ipv4Addr, config: &NodeConfig) -> Self {
        let port = PeerLocator::new(config.timeout())
            .find_port(ip, &config.candidate_ports())
            .await;
        Self::new(ip, port, config.timeout())
    }

    pub fn new(ip: Ipv4Addr, port: Option<u16>, timeout: Duration) -> Self {
        Self { ip, port, timeout }
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Sends `line` and returns the peer's reply as-is. Network faults are
    /// turned into an `ER Unable to connect ...` line.
    pub async fn forward_request(&self, line: &str) -> String {
        let port = match self.port {
            Some(port) => port,
            None => {
                log::error!("Unable to connect to {}: no open port found", self.ip);
                return format!("ER Unable to connect to {}: no open port found", self.ip);
            }
        };
        log::info!("Forwarding to {}:{} | {}", self.ip, port, line);
        match self.exchange(port, line).await {
            Ok(response) => {
                log::info!("Response from {}:{} | {}", self.ip, port, response);
                response
            }
            Err(e) => {
                log::error!("Request to {}:{} failed: {}", self.ip, port, e);
                format!("ER Unable to connect to {}:{} - {}", self.ip, port, e)
            }
        }
    }

    async fn exchange(&self, port: u16, line: &str) -> Result<String, NetError> {
        let stream = connect(SocketAddr::from((self.ip, port)), self.timeout).await?;
        request_line(stream, line, self.timeout).await
    }
}
