//! Error taxonomy for the usage API client.

use thiserror::Error;

/// Failures reported by [`super::client::ApiClient`] and the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("no session key configured")]
    NoSessionKey,

    #[error("no organization ID configured")]
    NoOrganizationId,

    #[error("unauthorized - session key may be invalid")]
    Unauthorized,

    #[error("session expired - please update session key")]
    SessionExpired,

    #[error("rate limited - please wait before retrying")]
    RateLimited,

    #[error("claude API is unavailable")]
    ServiceUnavailable,

    #[error("authentication failed")]
    AuthFailed,

    #[error("no organizations found")]
    NoOrganizations,

    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("failed to parse response: {0}")]
    ParseFailed(String),
}

impl ApiError {
    /// Auth errors never heal by retrying the same credential.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::SessionExpired)
    }

    /// Whether the client may repeat the request once. Rate limiting and
    /// server outages are left to the poller's backoff.
    pub fn is_retryable(&self) -> bool {
        !self.is_auth_error()
            && !matches!(self, ApiError::RateLimited | ApiError::ServiceUnavailable)
    }
}
