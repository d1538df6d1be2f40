use reqwest::StatusCode;
use thiserror::Error;

use super::request::ApiRequest;
use crate::auth::StoreError;
use crate::utils::truncate_string;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{} {} failed with status {status}", .request.method, .request.path)]
    Status {
        status: StatusCode,
        /// Response body, parsed as JSON when possible
        data: Option<serde_json::Value>,
        request: Box<ApiRequest>,
    },

    #[error("Network error for {} {}: {source}", .request.method, .request.path)]
    Network {
        #[source]
        source: reqwest::Error,
        request: Box<ApiRequest>,
    },

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Why a token refresh did not produce a new access token.
/// Clone so one outcome can be handed to every request waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("No refresh token found")]
    NoRefreshToken,

    #[error("Failed to refresh access token: {0}")]
    Store(StoreError),

    #[error("Failed to refresh access token: {message}")]
    Failed {
        status: Option<StatusCode>,
        message: String,
    },
}

/// Maximum length for error response bodies kept as text
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid carrying excessive data
    fn truncate_body(body: &str) -> String {
        let total = body.chars().count();
        if total <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{} (truncated, {} total chars)",
                truncate_string(body, MAX_ERROR_BODY_LENGTH),
                total
            )
        }
    }

    /// Build the error for a non-2xx response
    pub fn from_status(status: StatusCode, body: &[u8], request: ApiRequest) -> Self {
        let data = if body.is_empty() {
            None
        } else {
            match serde_json::from_slice::<serde_json::Value>(body) {
                Ok(value) => Some(value),
                Err(_) => Some(serde_json::Value::String(Self::truncate_body(
                    &String::from_utf8_lossy(body),
                ))),
            }
        };
        ApiError::Status {
            status,
            data,
            request: Box::new(request),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Refresh(RefreshError::Failed { status, .. }) => *status,
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }

    /// The request that produced this error, when it reached the transport
    pub fn request(&self) -> Option<&ApiRequest> {
        match self {
            ApiError::Status { request, .. } | ApiError::Network { request, .. } => Some(request.as_ref()),
            _ => None,
        }
    }

    /// Server-provided `message` or `detail` field, if the body had one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { data: Some(data), .. } => data
                .get("message")
                .or_else(|| data.get("detail"))
                .and_then(|v| v.as_str())
                .or_else(|| data.as_str()),
            _ => None,
        }
    }
}

impl RefreshError {
    /// Describe a failed refresh call without keeping the non-Clone source
    pub(crate) fn from_api(err: &ApiError) -> Self {
        match err {
            ApiError::Store(e) => RefreshError::Store(e.clone()),
            ApiError::Refresh(e) => e.clone(),
            other => RefreshError::Failed {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}
