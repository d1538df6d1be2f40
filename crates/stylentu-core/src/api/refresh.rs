//! Access token refresh.
//!
//! `Refresher::refresh_access_token` exchanges the stored refresh token for a
//! new access token and persists it. `Refresher::refresh_rejected` wraps it so
//! requests rejected together share one refresh call: refreshes run one at a
//! time, and a request whose token has already been replaced in the store is
//! replayed with the stored token instead of refreshing again. Nothing about a
//! finished refresh is kept in memory; the store is the only source of tokens.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::request::ApiRequest;
use super::transport::Transport;
use super::RefreshError;
use crate::auth::{CredentialStore, ACCESS_TOKEN_KEY};

/// Default refresh endpoint path
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh-token";

#[derive(Serialize)]
struct RefreshRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(rename = "accessToken", default)]
    access_token: Option<String>,
}

pub struct Refresher<T, S> {
    transport: Arc<T>,
    store: Arc<S>,
    refresh_path: String,
    // Held for the whole refresh call; waiters queue here
    in_flight: Mutex<()>,
}

impl<T: Transport, S: CredentialStore> Refresher<T, S> {
    pub fn new(transport: Arc<T>, store: Arc<S>, refresh_path: impl Into<String>) -> Self {
        Self {
            transport,
            store,
            refresh_path: refresh_path.into(),
            in_flight: Mutex::new(()),
        }
    }

    /// Get a usable access token after the server rejected `rejected`.
    ///
    /// Waits for any refresh already running. If the store then holds a
    /// different access token than the rejected one, that token is returned
    /// without a refresh call. Otherwise the refresh primitive runs.
    pub async fn refresh_rejected(&self, rejected: Option<&str>) -> Result<String, RefreshError> {
        let _guard = self.in_flight.lock().await;

        if let Some(rejected) = rejected {
            let current = self
                .store
                .access_token()
                .await
                .map_err(RefreshError::Store)?;
            if let Some(current) = current.filter(|t| t != rejected) {
                debug!("Access token already replaced in store, not refreshing");
                return Ok(current);
            }
        }

        self.refresh_access_token().await
    }

    /// Exchange the refresh token for a new access token and store it.
    /// Never retried here; the caller decides what a failure means.
    pub async fn refresh_access_token(&self) -> Result<String, RefreshError> {
        let refresh_token = self
            .store
            .refresh_token()
            .await
            .map_err(RefreshError::Store)?
            .ok_or(RefreshError::NoRefreshToken)?;

        debug!(path = %self.refresh_path, "Refreshing access token");

        let request = ApiRequest::post(self.refresh_path.as_str())
            .json(&RefreshRequest {
                token: &refresh_token,
            })
            .map_err(|e| RefreshError::from_api(&e))?;

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token refresh request failed");
                return Err(RefreshError::from_api(&e));
            }
        };

        let body: RefreshResponse = response.json().map_err(|e| RefreshError::Failed {
            status: Some(response.status),
            message: e.to_string(),
        })?;

        let access_token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RefreshError::Failed {
                status: Some(response.status),
                message: "Refresh response does not contain accessToken".to_string(),
            })?;

        self.store
            .set(ACCESS_TOKEN_KEY, &access_token)
            .await
            .map_err(RefreshError::Store)?;

        info!("Access token refreshed");
        Ok(access_token)
    }
}
