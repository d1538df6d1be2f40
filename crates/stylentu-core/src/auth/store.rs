use futures::future::BoxFuture;
use thiserror::Error;

/// Store key holding the short-lived access token
pub const ACCESS_TOKEN_KEY: &str = "token";

/// Store key holding the long-lived refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Failed to read '{key}' from credential store: {message}")]
    Read { key: String, message: String },

    #[error("Failed to write '{key}' to credential store: {message}")]
    Write { key: String, message: String },

    #[error("Failed to remove '{key}' from credential store: {message}")]
    Remove { key: String, message: String },
}

impl StoreError {
    pub fn read(key: &str, err: impl std::fmt::Display) -> Self {
        StoreError::Read {
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    pub fn write(key: &str, err: impl std::fmt::Display) -> Self {
        StoreError::Write {
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    pub fn remove(key: &str, err: impl std::fmt::Display) -> Self {
        StoreError::Remove {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

/// Durable key-value storage for the two session tokens.
///
/// The store is the only owner of the tokens. Callers read it at the moment
/// they need a value and never keep a copy across requests.
pub trait CredentialStore: Send + Sync {
    /// Read a value, `None` when the key has never been written or was removed
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>>;

    /// Write a value, overwriting any previous one
    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Remove a value. Removing an absent key is not an error.
    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>>;

    fn access_token(&self) -> BoxFuture<'_, Result<Option<String>, StoreError>> {
        self.get(ACCESS_TOKEN_KEY)
    }

    fn refresh_token(&self) -> BoxFuture<'_, Result<Option<String>, StoreError>> {
        self.get(REFRESH_TOKEN_KEY)
    }
}
