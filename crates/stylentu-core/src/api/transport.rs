use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::debug;

use super::request::{ApiRequest, ApiResponse, Body, FormPart};
use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Issues one request and returns its response.
///
/// Any non-2xx status comes back as `ApiError::Status` and connection
/// failures as `ApiError::Network`; both hand the request back to the caller.
pub trait Transport: Send + Sync {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, ApiError>>;
}

/// `Transport` over a pooled reqwest client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self::with_client(client, base_url))
    }

    /// Share an existing client's connection pool
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(&request.path);
        debug!(method = %request.method, url = %url, "Sending HTTP request");

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(request.headers.clone());
        match request.body {
            Some(Body::Json(ref value)) => builder = builder.json(value),
            Some(Body::Form(ref parts)) => builder = builder.multipart(build_form(parts)?),
            None => {}
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(source) => {
                return Err(ApiError::Network {
                    source,
                    request: Box::new(request),
                })
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(source) => {
                return Err(ApiError::Network {
                    source,
                    request: Box::new(request),
                })
            }
        };

        debug!(status = %status, bytes = body.len(), "Received HTTP response");

        if status.is_success() {
            Ok(ApiResponse {
                status,
                headers,
                body,
            })
        } else {
            Err(ApiError::from_status(status, &body, request))
        }
    }
}

/// Build a fresh multipart form; a `Form` is consumed by each send
fn build_form(parts: &[FormPart]) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for part in parts {
        let mut field = Part::bytes(part.data.clone());
        if let Some(ref file_name) = part.file_name {
            field = field.file_name(file_name.clone());
        }
        if let Some(ref mime) = part.mime {
            field = field.mime_str(mime).map_err(|e| {
                ApiError::InvalidRequest(format!("Invalid content type for form field '{}': {}", part.name, e))
            })?;
        }
        form = form.part(part.name.clone(), field);
    }
    Ok(form)
}

impl Transport for HttpTransport {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, ApiError>> {
        self.execute(request).boxed()
    }
}
