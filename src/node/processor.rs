use super::{api, NodeContext, NodeError};
use crate::bank::AccountStore;
use crate::protocol::{failure_response, Command, ProtocolError, Verb, INTERNAL_ERROR_RESPONSE};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Turns request lines into responses. Shared by every session of a node.
pub struct CommandProcessor<S: AccountStore> {
    context: Arc<NodeContext<S>>,
}

impl<S: AccountStore> CommandProcessor<S> {
    pub fn new(context: Arc<NodeContext<S>>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<NodeContext<S>> {
        &self.context
    }

    /// `None` for a blank line, which gets no answer.
    pub async fn process_line(&self, line: &str) -> Option<String> {
        match Command::parse(line) {
            Ok(cmd) => Some(self.dispatch(&cmd).await),
            Err(ProtocolError::EmptyLine) => {
                log::debug!("Ignoring empty line");
                None
            }
            Err(e) => Some(format!("ER {}", e)),
        }
    }

    pub async fn dispatch(&self, cmd: &Command) -> String {
        let verb = match cmd.verb().parse::<Verb>() {
            Ok(verb) => verb,
            Err(e) => {
                log::warn!("Unknown command: {}", cmd.line());
                return format!("ER {}", e);
            }
        };
        let result = AssertUnwindSafe(self.execute(verb, cmd))
            .catch_unwind()
            .await
            .unwrap_or(Err(NodeError::HandlerPanicked));
        match result {
            Ok(response) => {
                self.context.observer.command_executed(verb);
                response
            }
            Err(e) => match e.client_reason() {
                Some(reason) => failure_response(verb, &reason),
                None => {
                    log::error!("Error happened while executing {}: {}", cmd.line(), e);
                    INTERNAL_ERROR_RESPONSE.into()
                }
            },
        }
    }

    async fn execute(&self, verb: Verb, cmd: &Command) -> Result<String, NodeError> {
        let context = Arc::clone(&self.context);
        match verb {
            Verb::BankCode => api::bank_code(context, cmd).await,
            Verb::AccountCreate => api::account_create(context, cmd).await,
            Verb::AccountDeposit => api::account_deposit(context, cmd).await,
            Verb::AccountWithdrawal => api::account_withdraw(context, cmd).await,
            Verb::AccountBalance => api::account_balance(context, cmd).await,
            Verb::AccountRemove => api::account_remove(context, cmd).await,
            Verb::BankAmount => api::bank_amount(context, cmd).await,
            Verb::BankNumber => api::bank_number(context, cmd).await,
            Verb::RobberyPlan => api::robbery_plan(context, cmd).await,
        }
    }
}
