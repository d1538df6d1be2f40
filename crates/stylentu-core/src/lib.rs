//! Core library for the StyleNTU wardrobe client.
//!
//! - `auth`: credential stores and the login/logout session boundary
//! - `api`: the authenticated request pipeline (bearer token, refresh, replay)
//! - `config`: client configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod utils;

pub use api::{ApiError, ApiRequest, ApiResponse, AuthenticatedClient, Body, FormPart, RefreshError};
pub use auth::{AuthState, CredentialStore, Session, StoreError, TokenPair};
pub use config::{ClientConfig, CredentialBackend};
