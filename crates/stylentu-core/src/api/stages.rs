//! Request stages run, in order, on every request before dispatch.

use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use tracing::debug;

use super::request::ApiRequest;
use super::ApiError;
use crate::auth::CredentialStore;

pub trait RequestStage: Send + Sync {
    fn apply(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiRequest, ApiError>>;
}

/// Attaches the stored access token as a bearer credential.
///
/// The token is read from the store on every request. With no token the
/// request goes out unchanged; a failed read rejects it before dispatch.
pub struct BearerCredential<S> {
    store: Arc<S>,
}

impl<S> BearerCredential<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: CredentialStore> RequestStage for BearerCredential<S> {
    fn apply(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiRequest, ApiError>> {
        async move {
            match self.store.access_token().await? {
                Some(token) => request.with_bearer(&token),
                None => {
                    debug!(path = %request.path, "No access token, sending without authorization");
                    Ok(request)
                }
            }
        }
        .boxed()
    }
}

/// Adds fixed headers the request does not already carry
pub struct DefaultHeaders {
    headers: HeaderMap,
}

impl DefaultHeaders {
    pub fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }

    /// `Accept: application/json`
    pub fn json() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Self::new(headers)
    }
}

impl RequestStage for DefaultHeaders {
    fn apply(&self, mut request: ApiRequest) -> BoxFuture<'_, Result<ApiRequest, ApiError>> {
        for (name, value) in &self.headers {
            if !request.headers.contains_key(name) {
                request.headers.insert(name.clone(), value.clone());
            }
        }
        future::ready(Ok(request)).boxed()
    }
}
