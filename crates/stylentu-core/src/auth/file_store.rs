use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::store::{CredentialStore, StoreError};

/// Credentials file name in the data directory
pub const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredValue {
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

type StoredValues = BTreeMap<String, StoredValue>;

/// Credential store persisted as a JSON document on disk.
/// For machines without a usable OS keychain.
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Arc<Mutex<()>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When a value was last written, if present
    pub fn updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(load(&self.path)?.get(key).map(|v| v.updated_at))
    }

    /// Run a blocking file operation off the async runtime, under the lock
    async fn with_file<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        let lock = Arc::clone(&self.lock);
        tokio::task::spawn_blocking(move || {
            let _guard = lock.lock().map_err(|e| anyhow::anyhow!("{}", e))?;
            op(&path)
        })
        .await
        .context("Credentials file task failed")?
    }
}

fn read_contents(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).context("Failed to read credentials file")?;
    if contents.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(contents))
}

fn load(path: &Path) -> Result<StoredValues> {
    match read_contents(path)? {
        Some(contents) => serde_json::from_str(&contents).context("Failed to parse credentials file"),
        None => Ok(BTreeMap::new()),
    }
}

/// Replace the file atomically. The temporary file is created owner-only,
/// so the tokens are never readable by others, even briefly.
fn save(path: &Path, values: &StoredValues) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    let contents = serde_json::to_vec_pretty(values)?;

    let mut builder = tempfile::Builder::new();
    builder.prefix(".credentials").suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o600));
    }
    let mut file = builder
        .tempfile_in(dir)
        .context("Failed to create temporary credentials file")?;
    file.write_all(&contents)
        .context("Failed to write credentials file")?;
    file.as_file()
        .sync_all()
        .context("Failed to write credentials file")?;
    file.persist(path)
        .map_err(|e| e.error)
        .context("Failed to replace credentials file")?;
    Ok(())
}

fn read_value(path: &Path, key: &str) -> Result<Option<String>> {
    Ok(load(path)?.remove(key).map(|v| v.value))
}

fn write_value(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut values = load(path)?;
    values.insert(
        key.to_string(),
        StoredValue {
            value: value.to_string(),
            updated_at: Utc::now(),
        },
    );
    save(path, &values)?;
    debug!(key = key, path = %path.display(), "Credential written");
    Ok(())
}

/// An unparseable file is reset to empty so logout always succeeds
fn remove_value(path: &Path, key: &str) -> Result<()> {
    let contents = match read_contents(path)? {
        Some(contents) => contents,
        None => return Ok(()),
    };
    let mut values: StoredValues = match serde_json::from_str(&contents) {
        Ok(values) => values,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Credentials file is corrupt, resetting it");
            return save(path, &BTreeMap::new());
        }
    };
    if values.remove(key).is_some() {
        save(path, &values)?;
        debug!(key = key, path = %path.display(), "Credential removed");
    }
    Ok(())
}

impl CredentialStore for FileStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        let owned = key.to_string();
        async move {
            self.with_file(move |path| read_value(path, &owned))
                .await
                .map_err(|e| StoreError::read(key, format!("{:#}", e)))
        }
        .boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        let owned_key = key.to_string();
        let owned_value = value.to_string();
        async move {
            self.with_file(move |path| write_value(path, &owned_key, &owned_value))
                .await
                .map_err(|e| StoreError::write(key, format!("{:#}", e)))
        }
        .boxed()
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        let owned = key.to_string();
        async move {
            self.with_file(move |path| remove_value(path, &owned))
                .await
                .map_err(|e| StoreError::remove(key, format!("{:#}", e)))
        }
        .boxed()
    }
}
