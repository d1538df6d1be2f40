//! Credential storage and the login/logout boundary.
//!
//! This module provides:
//! - `CredentialStore`: async key-value storage for the access and refresh tokens
//! - `KeyringStore`, `FileStore`, `MemoryStore`: the store backends
//! - `ConfiguredStore`: whichever backend the configuration selects
//! - `Session`: writes both tokens at login, removes both at logout

pub mod configured;
pub mod file_store;
pub mod keyring_store;
pub mod memory_store;
pub mod session;
pub mod store;

pub use configured::ConfiguredStore;
pub use file_store::FileStore;
pub use keyring_store::KeyringStore;
pub use memory_store::MemoryStore;
pub use session::{AuthState, Session, TokenPair};
pub use store::{CredentialStore, StoreError, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
