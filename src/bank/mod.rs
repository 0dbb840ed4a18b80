use crate::core::{Account, AccountNumber, Money, MAX_ACCOUNT_NUMBER, MIN_ACCOUNT_NUMBER};
use crate::db::{AccountDb, DbError};
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BankError {
    #[error("Account not found")]
    AccountNotFound,
    #[error("Insufficient funds")]
    InsufficientFunds,
    #[error("Balance must be 0")]
    BalanceNotZero,
    #[error("Invalid arguments")]
    InvalidAmount,
    #[error("all account numbers are taken")]
    Exhausted,
    #[error("ledger contains invalid or duplicate account {0}")]
    InvalidLedger(AccountNumber),
    #[error("db error happened: {0}")]
    DbError(#[from] DbError),
}

/// The account operations the command handlers rely on.
pub trait AccountStore: Send + Sync {
    fn create_account(&self) -> Result<AccountNumber, BankError>;
    fn deposit(&self, number: AccountNumber, amount: Money) -> Result<(), BankError>;
    fn withdraw(&self, number: AccountNumber, amount: Money) -> Result<(), BankError>;
    fn get_balance(&self, number: AccountNumber) -> Result<Money, BankError>;
    fn delete_account(&self, number: AccountNumber) -> Result<(), BankError>;
    fn list_all(&self) -> Result<Vec<Account>, BankError>;
    fn total_balance(&self) -> Result<Money, BankError>;
    fn client_count(&self) -> Result<usize, BankError>;
}

struct Ledger<D: AccountDb> {
    db: D,
    accounts: BTreeMap<AccountNumber, Money>,
}

impl<D: AccountDb> Ledger<D> {
    /// Persists `accounts` and only then makes them the live state.
    fn commit(&mut self, accounts: BTreeMap<AccountNumber, Money>) -> Result<(), BankError> {
        let snapshot = accounts
            .iter()
            .map(|(number, balance)| Account {
                number: *number,
                balance: *balance,
            })
            .collect::<Vec<_>>();
        self.db.save(&snapshot)?;
        self.accounts = accounts;
        Ok(())
    }

    fn balance_of(&self, number: AccountNumber) -> Result<Money, BankError> {
        self.accounts
            .get(&number)
            .copied()
            .ok_or(BankError::AccountNotFound)
    }

    fn with_balance(
        &mut self,
        number: AccountNumber,
        balance: Money,
    ) -> Result<(), BankError> {
        let mut accounts = self.accounts.clone();
        accounts.insert(number, balance);
        self.commit(accounts)
    }
}

/// Account ledger guarded by a single lock. Every mutation is persisted
/// through the underlying [`AccountDb`] before it becomes visible.
pub struct Bank<D: AccountDb> {
    ledger: Mutex<Ledger<D>>,
}

impl<D: AccountDb> Bank<D> {
    pub fn new(db: D) -> Result<Bank<D>, BankError> {
        let mut accounts = BTreeMap::new();
        for acc in db.load()? {
            if !Account::is_valid_number(acc.number)
                || accounts.insert(acc.number, acc.balance).is_some()
            {
                return Err(BankError::InvalidLedger(acc.number));
            }
        }
        log::info!("Ledger loaded with {} accounts", accounts.len());
        Ok(Bank {
            ledger: Mutex::new(Ledger { db, accounts }),
        })
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger<D>> {
        // State only changes through `commit`, so a poisoned ledger is still whole.
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<D: AccountDb> AccountStore for Bank<D> {
    fn create_account(&self) -> Result<AccountNumber, BankError> {
        let mut ledger = self.ledger();
        let capacity = (MAX_ACCOUNT_NUMBER - MIN_ACCOUNT_NUMBER + 1) as usize;
        if ledger.accounts.len() >= capacity {
            return Err(BankError::Exhausted);
        }
        let mut rng = rand::thread_rng();
        let number = loop {
            let candidate = rng.gen_range(MIN_ACCOUNT_NUMBER..=MAX_ACCOUNT_NUMBER);
            if !ledger.accounts.contains_key(&candidate) {
                break candidate;
            }
        };
        ledger.with_balance(number, 0)?;
        log::info!("Account {} created", number);
        Ok(number)
    }

    fn deposit(&self, number: AccountNumber, amount: Money) -> Result<(), BankError> {
        if amount == 0 {
            return Err(BankError::InvalidAmount);
        }
        let mut ledger = self.ledger();
        let balance = ledger.balance_of(number)?;
        let new_balance = balance
            .checked_add(amount)
            .ok_or(BankError::InvalidAmount)?;
        ledger.with_balance(number, new_balance)
    }

    fn withdraw(&self, number: AccountNumber, amount: Money) -> Result<(), BankError> {
        if amount == 0 {
            return Err(BankError::InvalidAmount);
        }
        let mut ledger = self.ledger();
        let balance = ledger.balance_of(number)?;
        if balance < amount {
            return Err(BankError::InsufficientFunds);
        }
        ledger.with_balance(number, balance - amount)
    }

    fn get_balance(&self, number: AccountNumber) -> Result<Money, BankError> {
        self.ledger().balance_of(number)
    }

    fn delete_account(&self, number: AccountNumber) -> Result<(), BankError> {
        let mut ledger = self.ledger();
        if ledger.balance_of(number)? != 0 {
            return Err(BankError::BalanceNotZero);
        }
        let mut accounts = ledger.accounts.clone();
        accounts.remove(&number);
        ledger.commit(accounts)?;
        log::info!("Account {} removed", number);
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<Account>, BankError> {
        Ok(self
            .ledger()
            .accounts
            .iter()
            .map(|(number, balance)| Account {
                number: *number,
                balance: *balance,
            })
            .collect())
    }

    fn total_balance(&self) -> Result<Money, BankError> {
        Ok(self
            .ledger()
            .accounts
            .values()
            .fold(0, |sum: Money, b| sum.saturating_add(*b)))
    }

    fn client_count(&self) -> Result<usize, BankError> {
        Ok(self.ledger().accounts.len())
    }
}
