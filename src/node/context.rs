use super::NodeObserver;
use crate::bank::AccountStore;
use crate::config::NodeConfig;
use std::net::Ipv4Addr;
use std::sync::Arc;

pub struct NodeContext<S: AccountStore> {
    pub config: NodeConfig,
    pub store: S,
    pub observer: Arc<dyn NodeObserver>,
}

impl<S: AccountStore> NodeContext<S> {
    pub fn new(config: NodeConfig, store: S, observer: Arc<dyn NodeObserver>) -> Self {
        Self {
            config,
            store,
            observer,
        }
    }

    pub fn self_ip(&self) -> Ipv4Addr {
        self.config.ip
    }

    pub fn is_local(&self, ip: Ipv4Addr) -> bool {
        ip == self.config.ip
    }
}
