use crate::protocol::Verb;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Hooks for following what the server does. All methods default to no-ops.
pub trait NodeObserver: Send + Sync {
    fn session_opened(&self, _id: u64, _remote: SocketAddr) {}
    fn session_closed(&self, _id: u64, _remote: SocketAddr) {}
    fn session_rejected(&self, _remote: SocketAddr) {}
    fn command_executed(&self, _verb: Verb) {}
}

pub struct NoopObserver;
impl NodeObserver for NoopObserver {}

#[derive(Default, Debug)]
pub struct NodeStats {
    active_sessions: AtomicUsize,
    total_sessions: AtomicU64,
    rejected_sessions: AtomicU64,
    executed_commands: AtomicU64,
}

impl NodeStats {
    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::Relaxed)
    }
    pub fn total_sessions(&self) -> u64 {
        self.total_sessions.load(Ordering::Relaxed)
    }
    pub fn rejected_sessions(&self) -> u64 {
        self.rejected_sessions.load(Ordering::Relaxed)
    }
    pub fn executed_commands(&self) -> u64 {
        self.executed_commands.load(Ordering::Relaxed)
    }
}

impl NodeObserver for NodeStats {
    fn session_opened(&self, id: u64, remote: SocketAddr) {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
        self.total_sessions.fetch_add(1, Ordering::Relaxed);
        log::info!("Client {} connected from {}", id, remote);
    }
    fn session_closed(&self, id: u64, remote: SocketAddr) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
        log::info!("Client {} ({}) disconnected", id, remote);
    }
    fn session_rejected(&self, remote: SocketAddr) {
        self.rejected_sessions.fetch_add(1, Ordering::Relaxed);
        log::warn!("Rejected {}: connection limit reached", remote);
    }
    fn command_executed(&self, _verb: Verb) {
        self.executed_commands.fetch_add(1, Ordering::Relaxed);
    }
}
