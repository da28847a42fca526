//! Scripted transport shared by tests across modules.

use super::client::ApiClient;
use super::error::ApiError;
use super::transport::{HttpResponse, HttpTransport};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Script {
    responses: VecDeque<Result<HttpResponse, ApiError>>,
    requests: Vec<(String, Vec<(&'static str, String)>)>,
}

/// Replays queued responses in order and records every request.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, status: u16, body: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .responses
            .push_back(Ok(HttpResponse::new(status, body)));
        self
    }

    pub fn push_error(&self, err: ApiError) -> &Self {
        self.script.lock().unwrap().responses.push_back(Err(err));
        self
    }

    pub fn request_count(&self) -> usize {
        self.script.lock().unwrap().requests.len()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.script
            .lock()
            .unwrap()
            .requests
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn last_header(&self, name: &str) -> Option<String> {
        let script = self.script.lock().unwrap();
        let (_, headers) = script.requests.last()?;
        headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.clone())
    }

    /// A client over this transport with no retry delay.
    pub fn client(&self) -> ApiClient {
        ApiClient::new(Box::new(self.clone()))
            .with_base_url("https://claude.test")
            .with_retry_delay(Duration::ZERO)
    }
}

impl HttpTransport for ScriptedTransport {
    fn get(&self, url: &str, headers: &[(&'static str, String)]) -> Result<HttpResponse, ApiError> {
        let mut script = self.script.lock().unwrap();
        script.requests.push((url.to_string(), headers.to_vec()));
        script
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::RequestFailed("no scripted response".to_string())))
    }
}

pub const ORGS_BODY: &str = r#"[{"uuid":"org-123","name":"Personal"},{"uuid":"org-456","name":"Team"}]"#;

pub const USAGE_BODY: &str = r#"{
    "five_hour": {"utilization": 42.0, "resets_at": "2025-06-01T15:00:00Z"},
    "seven_day": {"utilization": 17.0, "resets_at": "2025-06-05T00:00:00Z"}
}"#;

pub const SESSION_INVALID_BODY: &str =
    r#"{"type":"error","error":{"type":"permission_error","message":"Invalid authorization","details":{"error_code":"account_session_invalid"}}}"#;

pub fn usage_body(five_hour: f64, seven_day: f64) -> String {
    format!(
        r#"{{"five_hour":{{"utilization":{}}},"seven_day":{{"utilization":{}}}}}"#,
        five_hour, seven_day
    )
}
