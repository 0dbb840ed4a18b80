use crate::config::NodeConfig;
use crate::net::PeerProxy;
use std::net::Ipv4Addr;

/// Finds the bank node on `ip` and sends it one request line.
pub async fn send(conf: &NodeConfig, ip: Ipv4Addr, line: &str) -> String {
    PeerProxy::connect(ip, conf).await.forward_request(line).await
}
