//! HTTP transport used by the API client.
//!
//! The upstream service sits behind a bot-detection gate that rejects clients
//! which do not look like a desktop browser. Every request therefore carries
//! the full header fingerprint of a Chrome 131 session, in a fixed order.

use super::error::ApiError;
use std::time::Duration;

pub const BASE_URL: &str = "https://claude.ai";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Client-wide request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Prefix carried by session keys issued by the web app.
pub const SESSION_KEY_PREFIX: &str = "sk-ant-";

/// A fully-read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Blocking GET transport.
///
/// Only network-level failures are errors; every HTTP status comes back as
/// an [`HttpResponse`] so the client can classify it.
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str, headers: &[(&'static str, String)]) -> Result<HttpResponse, ApiError>;
}

/// Production transport backed by a shared `ureq` agent.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(REQUEST_TIMEOUT)
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, url: &str, headers: &[(&'static str, String)]) -> Result<HttpResponse, ApiError> {
        let mut request = self.agent.get(url);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        let mut response = request
            .call()
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::RequestFailed(format!("failed to read body: {}", e)))?;

        Ok(HttpResponse { status, body })
    }
}

/// Builds the `Cookie` header value for a session credential.
///
/// A bare session key is wrapped as `sessionKey=<key>`; anything else is
/// assumed to be a raw cookie string and passed through untouched.
pub fn session_cookie(session_key: &str) -> String {
    if session_key.starts_with(SESSION_KEY_PREFIX) {
        format!("sessionKey={}", session_key)
    } else {
        session_key.to_string()
    }
}

/// Browser headers for a request, in the order Chrome sends them.
pub fn browser_headers(base_url: &str, session_key: &str) -> Vec<(&'static str, String)> {
    vec![
        ("User-Agent", USER_AGENT.to_string()),
        ("Accept", "application/json".to_string()),
        ("Accept-Language", "en-US,en;q=0.9".to_string()),
        ("Content-Type", "application/json".to_string()),
        ("Cookie", session_cookie(session_key)),
        ("Origin", base_url.to_string()),
        ("Referer", format!("{}/", base_url)),
        ("Sec-Fetch-Dest", "empty".to_string()),
        ("Sec-Fetch-Mode", "cors".to_string()),
        ("Sec-Fetch-Site", "same-origin".to_string()),
        (
            "sec-ch-ua",
            r#""Chromium";v="131", "Not_A Brand";v="24""#.to_string(),
        ),
        ("sec-ch-ua-mobile", "?0".to_string()),
        ("sec-ch-ua-platform", r#""Windows""#.to_string()),
    ]
}

/// Shortens a credential for log output.
pub fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(12).collect();
    if visible.len() < secret.len() {
        format!("{}...", visible)
    } else {
        "***".to_string()
    }
}
