use super::{NodeContext, NodeError};
use crate::bank::AccountStore;
use crate::core::Money;
use crate::net::PeerProxy;
use crate::protocol::{AccountRef, Command};
use std::sync::Arc;

mod bank_code;
pub use bank_code::*;
mod account_create;
pub use account_create::*;
mod account_deposit;
pub use account_deposit::*;
mod account_withdraw;
pub use account_withdraw::*;
mod account_balance;
pub use account_balance::*;
mod account_remove;
pub use account_remove::*;
mod bank_amount;
pub use bank_amount::*;
mod bank_number;
pub use bank_number::*;
mod robbery_plan;
pub use robbery_plan::*;

fn account_ref(cmd: &Command, index: usize) -> Result<AccountRef, NodeError> {
    cmd.arg(index)
        .ok_or(NodeError::InvalidArguments)?
        .parse()
        .map_err(|_| NodeError::InvalidArguments)
}

fn amount(cmd: &Command, index: usize) -> Result<Money, NodeError> {
    match cmd.arg(index).map(str::parse::<Money>) {
        Some(Ok(amount)) if amount > 0 => Ok(amount),
        _ => Err(NodeError::InvalidArguments),
    }
}

/// Sends the command, exactly as it was received, to the node that owns
/// the account.
async fn forward<S: AccountStore>(
    context: &Arc<NodeContext<S>>,
    account: &AccountRef,
    cmd: &Command,
) -> String {
    PeerProxy::connect(account.ip, &context.config)
        .await
        .forward_request(cmd.line())
        .await
}
