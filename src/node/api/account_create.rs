use super::{NodeContext, NodeError};
use crate::bank::AccountStore;
use crate::protocol::Command;
use std::sync::Arc;

pub async fn account_create<S: AccountStore>(
    context: Arc<NodeContext<S>>,
    _cmd: &Command,
) -> Result<String, NodeError> {
    let number = context.store.create_account()?;
    Ok(format!("AC {}/{}", number, context.self_ip()))
}
