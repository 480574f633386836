use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sync::policy::{ItemCase, ListPolicy};

#[derive(Debug, Error)]
pub enum AccountsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid accounts file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("XDG config directory is unavailable")]
    MissingConfigDir,
    #[error("account {0} is configured twice")]
    DuplicateAccount(String),
}

/// One account and the remote lists it keeps in sync.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccountConfig {
    pub username: String,
    #[serde(default)]
    pub lists: Vec<String>,
    #[serde(default)]
    pub list_prefix: String,
    #[serde(default)]
    pub auto_sort: bool,
    #[serde(default)]
    pub item_case: ItemCase,
}

impl AccountConfig {
    pub fn policy(&self) -> ListPolicy {
        ListPolicy {
            item_case: self.item_case,
            auto_sort: self.auto_sort,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccountsFile {
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

impl AccountsFile {
    pub async fn load(path: &Path) -> Result<Self, AccountsError> {
        let raw = tokio::fs::read(path).await?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &[u8]) -> Result<Self, AccountsError> {
        let file: AccountsFile = serde_json::from_slice(raw)?;
        let mut seen = HashSet::new();
        for account in &file.accounts {
            if !seen.insert(account.username.as_str()) {
                return Err(AccountsError::DuplicateAccount(account.username.clone()));
            }
        }
        Ok(file)
    }

    /// Writes through a sibling temp file so a crash never leaves a torn file.
    pub async fn save(&self, path: &Path) -> Result<(), AccountsError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    pub fn account(&self, username: &str) -> Option<&AccountConfig> {
        self.accounts
            .iter()
            .find(|account| account.username == username)
    }

    /// Drops `list_id` from the account's synced lists. Returns `true` when
    /// something was removed.
    pub fn remove_list(&mut self, username: &str, list_id: &str) -> bool {
        let Some(account) = self
            .accounts
            .iter_mut()
            .find(|account| account.username == username)
        else {
            return false;
        };
        let before = account.lists.len();
        account.lists.retain(|id| id != list_id);
        account.lists.len() != before
    }
}

pub fn default_accounts_path() -> Result<PathBuf, AccountsError> {
    let base = dirs::config_dir().ok_or(AccountsError::MissingConfigDir)?;
    Ok(base.join("keepsync").join("accounts.json"))
}
