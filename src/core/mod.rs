use serde_derive::{Deserialize, Serialize};

pub type AccountNumber = u32;
pub type Money = u64;

pub const MIN_ACCOUNT_NUMBER: AccountNumber = 10000;
pub const MAX_ACCOUNT_NUMBER: AccountNumber = 99999;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Account {
    pub number: AccountNumber,
    pub balance: Money,
}

impl Account {
    pub fn is_valid_number(number: AccountNumber) -> bool {
        (MIN_ACCOUNT_NUMBER..=MAX_ACCOUNT_NUMBER).contains(&number)
    }
}
