use keepsync_integrations::ids::KEYRING_SERVICE;
use keyring::Entry;
use thiserror::Error;

const TOKEN_ENV: &str = "KEEPSYNC_TOKEN";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("keyring error: {0}")]
    KeyringError(#[from] keyring::Error),
    #[error("no token stored for {0}")]
    TokenNotFound(String),
}

/// Read-only view of one account's credential. Tokens are provisioned
/// outside the daemon; it only looks them up and can forget them.
pub struct TokenStorage {
    username: String,
    entry: Entry,
}

impl TokenStorage {
    pub fn for_account(username: &str) -> Result<Self, StorageError> {
        Ok(Self {
            username: username.to_string(),
            entry: Entry::new(KEYRING_SERVICE, username)?,
        })
    }

    pub fn get_token(&self) -> Result<String, StorageError> {
        pick_token(std::env::var(TOKEN_ENV).ok(), || {
            match self.entry.get_password() {
                Ok(token) => Ok(token),
                Err(keyring::Error::NoEntry) => {
                    Err(StorageError::TokenNotFound(self.username.clone()))
                }
                Err(err) => Err(StorageError::KeyringError(err)),
            }
        })
    }

    pub fn delete_token(&self) -> Result<(), StorageError> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(StorageError::KeyringError(err)),
        }
    }
}

fn pick_token<F>(override_token: Option<String>, stored: F) -> Result<String, StorageError>
where
    F: FnOnce() -> Result<String, StorageError>,
{
    match override_token.map(|token| token.trim().to_string()) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => stored(),
    }
}
