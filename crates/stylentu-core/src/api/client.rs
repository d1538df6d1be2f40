//! Authenticated API client for the StyleNTU service.
//!
//! Every request passes through the request stages (bearer token first),
//! is dispatched through the transport, and on a first 401 gets one token
//! refresh and one replay. All other outcomes reach the caller unchanged.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::policy::{self, FailureAction};
use super::refresh::{Refresher, DEFAULT_REFRESH_PATH};
use super::request::{ApiRequest, ApiResponse, Attempt, FormPart};
use super::stages::{BearerCredential, DefaultHeaders, RequestStage};
use super::transport::{HttpTransport, Transport};
use super::{ApiError, RefreshError};
use crate::auth::{CredentialStore, TokenPair};
use crate::config::ClientConfig;

/// Default login endpoint path
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login/";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Clone is cheap - all state is shared behind `Arc`s.
pub struct AuthenticatedClient<T, S> {
    transport: Arc<T>,
    store: Arc<S>,
    stages: Vec<Arc<dyn RequestStage>>,
    refresher: Arc<Refresher<T, S>>,
    login_path: String,
}

impl<T, S> Clone for AuthenticatedClient<T, S> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            store: Arc::clone(&self.store),
            stages: self.stages.clone(),
            refresher: Arc::clone(&self.refresher),
            login_path: self.login_path.clone(),
        }
    }
}

impl<S: CredentialStore + 'static> AuthenticatedClient<HttpTransport, S> {
    /// Create a client for the configured service
    pub fn new(config: &ClientConfig, store: Arc<S>) -> Result<Self> {
        let transport = HttpTransport::new(
            &config.base_url,
            Duration::from_secs(config.request_timeout_secs),
        )?;

        Ok(Self::with_transport(transport, store)
            .with_refresh_path(&config.refresh_path)
            .with_login_path(&config.login_path))
    }
}

impl<T: Transport, S: CredentialStore + 'static> AuthenticatedClient<T, S> {
    /// Build a client over any transport. The bearer stage is always first.
    pub fn with_transport(transport: T, store: Arc<S>) -> Self {
        let transport = Arc::new(transport);
        let refresher = Arc::new(Refresher::new(
            Arc::clone(&transport),
            Arc::clone(&store),
            DEFAULT_REFRESH_PATH,
        ));
        let stages: Vec<Arc<dyn RequestStage>> = vec![
            Arc::new(BearerCredential::new(Arc::clone(&store))),
            Arc::new(DefaultHeaders::json()),
        ];

        Self {
            transport,
            store,
            stages,
            refresher,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }

    pub fn with_refresh_path(mut self, path: &str) -> Self {
        self.refresher = Arc::new(Refresher::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.store),
            path,
        ));
        self
    }

    pub fn with_login_path(mut self, path: &str) -> Self {
        self.login_path = path.to_string();
        self
    }

    /// Append a request stage after the built-in ones
    pub fn with_stage(mut self, stage: impl RequestStage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Send a request through the pipeline
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut request = self.prepare(request).await?;
        let mut attempt = Attempt::FIRST;

        loop {
            let err = match self.transport.send(request).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            match policy::on_failure(&err, attempt) {
                FailureAction::Propagate => {
                    if attempt.is_replay() {
                        debug!(attempt = attempt.number(), error = %err, "Replayed request failed");
                    }
                    return Err(err);
                }
                FailureAction::RefreshAndReplay => {
                    request = self.prepare_replay(err).await?;
                    attempt = attempt.next();
                }
            }
        }
    }

    /// Run the request stages in order
    async fn prepare(&self, mut request: ApiRequest) -> Result<ApiRequest, ApiError> {
        for stage in &self.stages {
            request = stage.apply(request).await?;
        }
        Ok(request)
    }

    /// Turn a first-attempt 401 into the replay request, or the error to return
    async fn prepare_replay(&self, err: ApiError) -> Result<ApiRequest, ApiError> {
        // Presence guard: the stored access token, not the refresh token,
        // decides whether a refresh is attempted.
        if self.store.access_token().await?.is_none() {
            debug!("401 without a stored access token, not refreshing");
            return Err(err);
        }

        let request = match err {
            ApiError::Status { request, .. } => *request,
            other => return Err(other),
        };

        info!(method = %request.method, path = %request.path, "Access token rejected, refreshing");

        let token = match self.refresher.refresh_rejected(request.bearer_token()).await {
            Ok(token) => token,
            Err(refresh_err) => {
                warn!(error = %refresh_err, path = %request.path, "Token refresh failed");
                return Err(ApiError::Refresh(refresh_err));
            }
        };

        request.with_bearer(&token)
    }

    /// Run the refresh primitive directly
    pub async fn refresh_access_token(&self) -> Result<String, RefreshError> {
        self.refresher.refresh_access_token().await
    }

    /// Exchange username and password for a token pair.
    ///
    /// Sent through the bare transport: a 401 here means wrong credentials.
    /// The pair is returned, not stored; see `Session::login`.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<TokenPair, ApiError> {
        let request = ApiRequest::post(self.login_path.as_str()).json(&LoginRequest { username, password })?;
        let response = self.transport.send(request).await?;
        let tokens: TokenPair = response.json()?;
        info!(username = username, "Authenticated");
        Ok(tokens)
    }

    // ===== JSON helpers =====

    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(ApiRequest::post(path).json(body)?).await?.json()
    }

    pub async fn patch_json<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(ApiRequest::patch(path).json(body)?).await?.json()
    }

    /// POST a multipart form, e.g. a new dress with its photo
    pub async fn post_form<R: DeserializeOwned>(&self, path: &str, parts: Vec<FormPart>) -> Result<R, ApiError> {
        self.send(ApiRequest::post(path).form(parts)).await?.json()
    }

    pub async fn patch_form<R: DeserializeOwned>(&self, path: &str, parts: Vec<FormPart>) -> Result<R, ApiError> {
        self.send(ApiRequest::patch(path).form(parts)).await?.json()
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::delete(path)).await
    }
}
