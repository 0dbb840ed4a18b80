use super::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Accounts stored as a pretty-printed JSON array in a single file.
pub struct JsonAccountDb {
    path: PathBuf,
}

impl JsonAccountDb {
    pub fn new(path: &Path) -> Result<JsonAccountDb, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(JsonAccountDb {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl AccountDb for JsonAccountDb {
    fn load(&self) -> Result<Vec<Account>, DbError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    fn save(&mut self, accounts: &[Account]) -> Result<(), DbError> {
        let tmp = self.temp_path();
        fs::write(&tmp, serde_json::to_vec_pretty(accounts)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
