use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use super::ApiError;

/// One outgoing API call, owned so it can be handed back inside an error
/// and replayed after a token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, or an absolute URL
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Body>,
}

/// Request payload, kept as owned data so a replay sends the same bytes
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(serde_json::Value),
    /// `multipart/form-data`, rebuilt from the parts on every dispatch
    Form(Vec<FormPart>),
}

/// One field of a multipart form
#[derive(Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub data: Vec<u8>,
    pub file_name: Option<String>,
    pub mime: Option<String>,
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: value.into().into_bytes(),
            file_name: None,
            mime: None,
        }
    }

    /// A file upload, e.g. a dress photo
    pub fn file(name: impl Into<String>, file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
            file_name: Some(file_name.into()),
            mime: None,
        }
    }

    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

// Image bytes stay out of logs and error output
impl fmt::Debug for FormPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormPart")
            .field("name", &self.name)
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("len", &self.data.len())
            .finish()
    }
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode request body: {}", e)))?;
        self.body = Some(Body::Json(value));
        Ok(self)
    }

    /// Attach a `multipart/form-data` body
    pub fn form(mut self, parts: Vec<FormPart>) -> Self {
        self.body = Some(Body::Form(parts));
        self
    }

    pub fn json_body(&self) -> Option<&serde_json::Value> {
        match self.body {
            Some(Body::Json(ref value)) => Some(value),
            _ => None,
        }
    }

    pub fn form_parts(&self) -> Option<&[FormPart]> {
        match self.body {
            Some(Body::Form(ref parts)) => Some(parts),
            _ => None,
        }
    }

    /// Set `Authorization: Bearer <token>`, replacing any previous value
    pub fn with_bearer(mut self, token: &str) -> Result<Self, ApiError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::InvalidRequest("Access token is not a valid header value".to_string()))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
    }

    /// The token this request was sent with, if it carried a bearer credential
    pub fn bearer_token(&self) -> Option<&str> {
        self.authorization().and_then(|v| v.strip_prefix("Bearer "))
    }
}

/// A successful (2xx) response with its body fully read
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        // Empty bodies (e.g. 204) decode as JSON null
        let bytes: &[u8] = if self.body.is_empty() { b"null" } else { &self.body };
        serde_json::from_slice(bytes)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON response: {}", e)))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Position of a dispatch within one request's attempt chain.
///
/// Threaded by value through the retry loop: the first dispatch is
/// `Attempt::FIRST`, the post-refresh replay is `FIRST.next()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Attempt(u8);

impl Attempt {
    pub const FIRST: Attempt = Attempt(0);

    pub fn next(self) -> Attempt {
        Attempt(self.0.saturating_add(1))
    }

    /// True once the request has been redispatched after a refresh
    pub fn is_replay(self) -> bool {
        self.0 > 0
    }

    pub fn number(self) -> u8 {
        self.0.saturating_add(1)
    }
}
