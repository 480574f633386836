mod accounts;
mod token_storage;

pub use accounts::{AccountConfig, AccountsError, AccountsFile, default_accounts_path};
pub use token_storage::{StorageError, TokenStorage};
