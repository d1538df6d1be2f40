use futures::future::BoxFuture;

use super::store::{CredentialStore, StoreError};
use super::{FileStore, KeyringStore};

/// The store selected by configuration
pub enum ConfiguredStore {
    Keyring(KeyringStore),
    File(FileStore),
}

impl ConfiguredStore {
    pub fn describe(&self) -> String {
        match self {
            ConfiguredStore::Keyring(store) => format!("OS keychain (service '{}')", store.service()),
            ConfiguredStore::File(store) => format!("file {}", store.path().display()),
        }
    }
}

impl CredentialStore for ConfiguredStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        match self {
            ConfiguredStore::Keyring(store) => store.get(key),
            ConfiguredStore::File(store) => store.get(key),
        }
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        match self {
            ConfiguredStore::Keyring(store) => store.set(key, value),
            ConfiguredStore::File(store) => store.set(key, value),
        }
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        match self {
            ConfiguredStore::Keyring(store) => store.remove(key),
            ConfiguredStore::File(store) => store.remove(key),
        }
    }
}
