//! Authenticated client for the usage API.

use super::error::ApiError;
use super::models::{parse_error_code, OrganizationInfo, UsageApiResponse, UsageSnapshot};
use super::transport::{browser_headers, HttpResponse, HttpTransport, BASE_URL};
use chrono::{DateTime, Utc};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Delay before the single built-in retry.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

const MAX_ATTEMPTS: u32 = 2;

const SESSION_INVALID_CODE: &str = "account_session_invalid";

#[derive(Default)]
struct ClientState {
    session_key: String,
    organization_id: String,
    last_usage: Option<UsageSnapshot>,
    last_fetch: Option<DateTime<Utc>>,
}

/// Usage API client.
///
/// The credential and the last good snapshot share one lock. Network calls
/// block the calling thread; the lock is never held across I/O.
pub struct ApiClient {
    transport: Box<dyn HttpTransport>,
    base_url: String,
    retry_delay: Duration,
    state: RwLock<ClientState>,
}

impl ApiClient {
    pub fn new(transport: Box<dyn HttpTransport>) -> Self {
        Self {
            transport,
            base_url: BASE_URL.to_string(),
            retry_delay: RETRY_DELAY,
            state: RwLock::new(ClientState::default()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ClientState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ClientState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_session_key(&self, key: &str) {
        self.write_state().session_key = key.to_string();
    }

    pub fn set_organization_id(&self, id: &str) {
        self.write_state().organization_id = id.to_string();
    }

    pub fn session_key(&self) -> String {
        self.read_state().session_key.clone()
    }

    pub fn organization_id(&self) -> String {
        self.read_state().organization_id.clone()
    }

    pub fn has_credentials(&self) -> bool {
        let state = self.read_state();
        !state.session_key.is_empty() && !state.organization_id.is_empty()
    }

    /// Last successfully fetched snapshot.
    pub fn last_usage(&self) -> Option<UsageSnapshot> {
        self.read_state().last_usage.clone()
    }

    pub fn last_fetch_time(&self) -> Option<DateTime<Utc>> {
        self.read_state().last_fetch
    }

    /// Lists the organizations visible to the current session.
    pub fn fetch_organizations(&self) -> Result<Vec<OrganizationInfo>, ApiError> {
        let session_key = self.session_key();
        if session_key.is_empty() {
            return Err(ApiError::NoSessionKey);
        }

        self.with_retry("organizations", || {
            self.fetch_organizations_once(&session_key)
        })
    }

    fn fetch_organizations_once(&self, session_key: &str) -> Result<Vec<OrganizationInfo>, ApiError> {
        let url = format!("{}/api/organizations", self.base_url);
        let response = self.get(&url, session_key)?;

        if let Some(err) = classify_auth_failure(&response) {
            tracing::warn!(
                "Organizations API returned {}: {}",
                response.status,
                body_preview(&response.body)
            );
            return Err(err);
        }

        if response.status != 200 {
            tracing::warn!(
                "Organizations API returned {}: {}",
                response.status,
                body_preview(&response.body)
            );
            return Err(ApiError::UnexpectedStatus(response.status));
        }

        serde_json::from_str(&response.body).map_err(|e| ApiError::ParseFailed(e.to_string()))
    }

    /// Fetches usage for the configured organization and caches it.
    pub fn fetch_usage(&self) -> Result<UsageSnapshot, ApiError> {
        let (session_key, org_id) = {
            let state = self.read_state();
            (state.session_key.clone(), state.organization_id.clone())
        };

        if session_key.is_empty() {
            return Err(ApiError::NoSessionKey);
        }
        if org_id.is_empty() {
            return Err(ApiError::NoOrganizationId);
        }

        self.with_retry("usage", || self.fetch_usage_once(&session_key, &org_id))
    }

    fn fetch_usage_once(&self, session_key: &str, org_id: &str) -> Result<UsageSnapshot, ApiError> {
        let url = format!("{}/api/organizations/{}/usage", self.base_url, org_id);
        let response = self.get(&url, session_key)?;

        if let Some(err) = classify_auth_failure(&response) {
            return Err(err);
        }

        match response.status {
            200 => {}
            429 => return Err(ApiError::RateLimited),
            status if status >= 500 => return Err(ApiError::ServiceUnavailable),
            status => return Err(ApiError::UnexpectedStatus(status)),
        }

        let parsed: UsageApiResponse = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::ParseFailed(format!("usage response: {}", e)))?;

        let now = Utc::now();
        let snapshot = parsed.to_snapshot(now);

        let mut state = self.write_state();
        state.last_usage = Some(snapshot.clone());
        state.last_fetch = Some(now);

        Ok(snapshot)
    }

    fn get(&self, url: &str, session_key: &str) -> Result<HttpResponse, ApiError> {
        let headers = browser_headers(&self.base_url, session_key);
        self.transport.get(url, &headers)
    }

    /// Runs `op` at most twice, sleeping `retry_delay` in between.
    /// Errors that are not [`ApiError::is_retryable`] are returned immediately.
    fn with_retry<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut last_err = ApiError::RequestFailed(format!("{} fetch not attempted", what));

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                tracing::info!("Retrying {} fetch (attempt {})...", what, attempt + 1);
                std::thread::sleep(self.retry_delay);
            }

            match op() {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    tracing::warn!("{} fetch attempt {} failed: {}", what, attempt + 1, err);
                    last_err = err;
                }
            }
        }

        Err(last_err)
    }
}

/// Maps 401/403 to `Unauthorized`, refined to `SessionExpired` when the body
/// carries the invalid-session error code.
fn classify_auth_failure(response: &HttpResponse) -> Option<ApiError> {
    if response.status != 401 && response.status != 403 {
        return None;
    }

    match parse_error_code(&response.body) {
        Some(code) if code == SESSION_INVALID_CODE => Some(ApiError::SessionExpired),
        Some(code) => {
            tracing::debug!("API error code: {}", code);
            Some(ApiError::Unauthorized)
        }
        None => Some(ApiError::Unauthorized),
    }
}

fn body_preview(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;
