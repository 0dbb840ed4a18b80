use super::{NodeContext, NodeError};
use crate::bank::AccountStore;
use crate::core::Money;
use crate::protocol::Command;
use crate::robbery::RobberyPlanner;
use std::sync::Arc;

pub async fn robbery_plan<S: AccountStore>(
    context: Arc<NodeContext<S>>,
    cmd: &Command,
) -> Result<String, NodeError> {
    let target = match cmd.arg(0).map(str::parse::<Money>) {
        Some(Ok(target)) if target > 0 => target,
        _ => return Err(NodeError::InvalidTargetAmount),
    };
    Ok(RobberyPlanner::new(&context.config)
        .execute_robbery_plan(target)
        .await)
}
