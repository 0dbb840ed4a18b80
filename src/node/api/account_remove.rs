use super::{account_ref, forward, NodeContext, NodeError};
use crate::bank::AccountStore;
use crate::protocol::Command;
use std::sync::Arc;

pub async fn account_remove<S: AccountStore>(
    context: Arc<NodeContext<S>>,
    cmd: &Command,
) -> Result<String, NodeError> {
    let account = account_ref(cmd, 0)?;
    if !context.is_local(account.ip) {
        return Ok(forward(&context, &account, cmd).await);
    }
    context.store.delete_account(account.number)?;
    Ok("AR".into())
}
