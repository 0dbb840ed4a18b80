use crate::bank::BankError;
use crate::config::ConfigError;
use crate::db::DbError;
use crate::net::NetError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Invalid arguments")]
    InvalidArguments,
    #[error("Invalid target amount")]
    InvalidTargetAmount,
    #[error("bank error happened: {0}")]
    BankError(#[from] BankError),
    #[error("db error happened: {0}")]
    DbError(#[from] DbError),
    #[error("config error happened: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("network error happened: {0}")]
    NetError(#[from] NetError),
    #[error("io error happened: {0}")]
    IoError(#[from] std::io::Error),
    #[error("handler panicked")]
    HandlerPanicked,
    #[error("node is not initialized, run `banknode init` first")]
    NotInitialized,
}

impl NodeError {
    /// The reason reported back to the client, for failures caused by the
    /// request itself. Everything else is an internal error.
    pub fn client_reason(&self) -> Option<String> {
        match self {
            NodeError::InvalidArguments | NodeError::InvalidTargetAmount => Some(self.to_string()),
            NodeError::BankError(
                e @ (BankError::AccountNotFound
                | BankError::InsufficientFunds
                | BankError::BalanceNotZero
                | BankError::InvalidAmount),
            ) => Some(e.to_string()),
            _ => None,
        }
    }
}
