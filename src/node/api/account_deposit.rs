use super::{account_ref, amount, forward, NodeContext, NodeError};
use crate::bank::AccountStore;
use crate::protocol::Command;
use std::sync::Arc;

pub async fn account_deposit<S: AccountStore>(
    context: Arc<NodeContext<S>>,
    cmd: &Command,
) -> Result<String, NodeError> {
    let account = account_ref(cmd, 0)?;
    let amount = amount(cmd, 1)?;
    if !context.is_local(account.ip) {
        return Ok(forward(&context, &account, cmd).await);
    }
    context.store.deposit(account.number, amount)?;
    log::info!("Deposited {} to {}", amount, account);
    Ok("AD".into())
}
