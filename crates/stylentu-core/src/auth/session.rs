use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::store::{CredentialStore, StoreError, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

/// Token pair returned by the login endpoint
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Authentication state as seen through the credential store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Access token present
    Authenticated,
    /// Only the refresh token is present. Not logged in.
    RefreshOnly,
    LoggedOut,
}

impl AuthState {
    pub fn label(&self) -> &'static str {
        match self {
            AuthState::Authenticated => "logged in",
            AuthState::RefreshOnly => "logged out (refresh token only)",
            AuthState::LoggedOut => "logged out",
        }
    }
}

/// Login/logout boundary over the shared credential store.
pub struct Session<S> {
    store: Arc<S>,
}

impl<S> Clone for Session<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: CredentialStore> Session<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Persist both tokens after a successful login
    pub async fn login(&self, tokens: &TokenPair) -> Result<(), StoreError> {
        // Refresh token goes first: an interrupted login leaves RefreshOnly,
        // never an access token without its refresh token.
        self.store.set(REFRESH_TOKEN_KEY, &tokens.refresh_token).await?;
        self.store.set(ACCESS_TOKEN_KEY, &tokens.access_token).await?;
        info!("Session established");
        Ok(())
    }

    /// Remove both tokens. Both removals are attempted; the first failure is returned.
    pub async fn logout(&self) -> Result<(), StoreError> {
        let access = self.store.remove(ACCESS_TOKEN_KEY).await;
        let refresh = self.store.remove(REFRESH_TOKEN_KEY).await;

        if let Err(ref e) = access {
            warn!(error = %e, "Failed to remove access token");
        }
        if let Err(ref e) = refresh {
            warn!(error = %e, "Failed to remove refresh token");
        }
        access.and(refresh)?;

        info!("Session cleared");
        Ok(())
    }

    pub async fn state(&self) -> Result<AuthState, StoreError> {
        if self.store.access_token().await?.is_some() {
            return Ok(AuthState::Authenticated);
        }
        let state = if self.store.refresh_token().await?.is_some() {
            AuthState::RefreshOnly
        } else {
            AuthState::LoggedOut
        };
        debug!(?state, "No access token in store");
        Ok(state)
    }

    pub async fn is_authenticated(&self) -> Result<bool, StoreError> {
        Ok(self.state().await? == AuthState::Authenticated)
    }
}
