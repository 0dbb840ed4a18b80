use super::{account_ref, amount, forward, NodeContext, NodeError};
use crate::bank::AccountStore;
use crate::protocol::Command;
use std::sync::Arc;

pub async fn account_withdraw<S: AccountStore>(
    context: Arc<NodeContext<S>>,
    cmd: &Command,
) -> Result<String, NodeError> {
    let account = account_ref(cmd, 0)?;
    let amount = amount(cmd, 1)?;
    if !context.is_local(account.ip) {
        return Ok(forward(&context, &account, cmd).await);
    }
    context.store.withdraw(account.number, amount)?;
    log::info!("Withdrew {} from {}", amount, account);
    Ok("AW".into())
}
