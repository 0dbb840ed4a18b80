mod log_info;

use super::{NodeContext, NodeError, NodeStats};
use crate::bank::AccountStore;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::sleep;

pub async fn heartbeat<S: AccountStore>(
    context: &Arc<NodeContext<S>>,
    stats: &NodeStats,
) -> Result<(), NodeError> {
    log_info::log_info(context, stats)?;
    Ok(())
}

/// Logs node status every `heartbeat_interval` until `shutdown` flips.
pub async fn heartbeater<S: AccountStore>(
    context: Arc<NodeContext<S>>,
    stats: Arc<NodeStats>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), NodeError> {
    let interval = match context.config.heartbeat_interval() {
        Some(interval) => interval,
        None => return Ok(()),
    };
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(interval) => {}
        }
        if let Err(e) = heartbeat(&context, &stats).await {
            log::error!("Error happened: {}", e);
        }
    }

    Ok(())
}
