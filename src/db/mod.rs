use crate::core::Account;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("db io error happened: {0}")]
    IoError(#[from] std::io::Error),
    #[error("db data corrupted: {0}")]
    Corrupted(#[from] serde_json::Error),
}

/// Where the ledger keeps its accounts between restarts.
///
/// `save` always receives the complete set of accounts; implementations
/// either store all of it or fail without touching what was there before.
pub trait AccountDb: Send {
    fn load(&self) -> Result<Vec<Account>, DbError>;
    fn save(&mut self, accounts: &[Account]) -> Result<(), DbError>;
}

mod ram;
pub use ram::*;

mod disk;
pub use disk::*;
