mod api;
mod context;
mod errors;
mod heartbeat;
mod observer;
mod processor;
mod server;
mod session;

pub use context::NodeContext;
pub use errors::NodeError;
pub use heartbeat::heartbeater;
pub use observer::{NodeObserver, NodeStats, NoopObserver};
pub use processor::CommandProcessor;
pub use server::ConnectionServer;
pub use session::{Session, SessionState};

#[cfg(test)]
mod test;
