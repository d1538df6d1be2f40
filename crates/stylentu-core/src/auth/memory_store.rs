use std::collections::HashMap;
use std::sync::Mutex;

use futures::future::{self, BoxFuture, FutureExt};

use super::store::{CredentialStore, StoreError};

/// In-process credential store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given entries
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let values = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        let result = self
            .values
            .lock()
            .map(|values| values.get(key).cloned())
            .map_err(|e| StoreError::read(key, e));
        future::ready(result).boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        let result = self
            .values
            .lock()
            .map(|mut values| {
                values.insert(key.to_string(), value.to_string());
            })
            .map_err(|e| StoreError::write(key, e));
        future::ready(result).boxed()
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        let result = self
            .values
            .lock()
            .map(|mut values| {
                values.remove(key);
            })
            .map_err(|e| StoreError::remove(key, e));
        future::ready(result).boxed()
    }
}
