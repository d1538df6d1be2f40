//! Authenticated REST client for the StyleNTU service.
//!
//! Requests carry the stored access token as a bearer credential. When the
//! server answers 401 the client refreshes the token once and replays the
//! request; every other outcome reaches the caller unchanged.

pub mod client;
pub mod error;
pub mod policy;
pub mod refresh;
pub mod request;
pub mod stages;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{AuthenticatedClient, DEFAULT_LOGIN_PATH};
pub use error::{ApiError, RefreshError};
pub use policy::FailureAction;
pub use refresh::{Refresher, DEFAULT_REFRESH_PATH};
pub use request::{ApiRequest, ApiResponse, Attempt, Body, FormPart};
pub use stages::{BearerCredential, DefaultHeaders, RequestStage};
pub use transport::{HttpTransport, Transport, REQUEST_TIMEOUT_SECS};
