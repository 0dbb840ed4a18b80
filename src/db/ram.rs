use super::*;

#[derive(Default, Clone, Debug)]
pub struct RamAccountDb(Vec<Account>);

impl RamAccountDb {
    pub fn new() -> RamAccountDb {
        RamAccountDb(Vec::new())
    }
    pub fn with_accounts(accounts: Vec<Account>) -> RamAccountDb {
        RamAccountDb(accounts)
    }
}

impl AccountDb for RamAccountDb {
    fn load(&self) -> Result<Vec<Account>, DbError> {
        Ok(self.0.clone())
    }
    fn save(&mut self, accounts: &[Account]) -> Result<(), DbError> {
        self.0 = accounts.to_vec();
        Ok(())
    }
}
