use futures::future::{BoxFuture, FutureExt};
use keyring::Entry;

use super::store::{CredentialStore, StoreError};

/// Default keychain service name
pub const DEFAULT_SERVICE_NAME: &str = "stylentu";

/// Credential store backed by the OS keychain.
/// Each store key becomes one keychain entry under the service name.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Run a blocking keychain operation off the async runtime
    async fn with_entry<T, F>(&self, key: &str, op: F) -> Result<T, keyring::Error>
    where
        T: Send + 'static,
        F: FnOnce(Entry) -> Result<T, keyring::Error> + Send + 'static,
    {
        let service = self.service.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &key)?;
            op(entry)
        })
        .await
        .map_err(|e| keyring::Error::PlatformFailure(Box::new(e)))?
    }
}

impl CredentialStore for KeyringStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        async move {
            match self.with_entry(key, |entry| entry.get_password()).await {
                Ok(value) => Ok(Some(value)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(StoreError::read(key, e)),
            }
        }
        .boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        let value = value.to_string();
        async move {
            self.with_entry(key, move |entry| entry.set_password(&value))
                .await
                .map_err(|e| StoreError::write(key, e))
        }
        .boxed()
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            match self.with_entry(key, |entry| entry.delete_credential()).await {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(StoreError::remove(key, e)),
            }
        }
        .boxed()
    }
}
