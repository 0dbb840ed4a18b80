use super::{NodeContext, NodeError};
use crate::bank::AccountStore;
use crate::protocol::Command;
use std::sync::Arc;

pub async fn bank_amount<S: AccountStore>(
    context: Arc<NodeContext<S>>,
    _cmd: &Command,
) -> Result<String, NodeError> {
    Ok(format!("BA {}", context.store.total_balance()?))
}
