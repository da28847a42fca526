use super::*;
use crate::api::testing::{ScriptedTransport, ORGS_BODY};
use crate::config::{Config, MemoryStore};
use crate::cookies::CookieError;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

struct FakeCookies {
    key: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl SessionKeySource for FakeCookies {
    fn extract_session_key(&self) -> Result<String, CookieError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.key.clone().ok_or(CookieError::NotFound)
    }
}

struct Harness {
    transport: ScriptedTransport,
    client: Arc<ApiClient>,
    store: Arc<MemoryStore>,
    cookie_calls: Arc<AtomicUsize>,
    auth: AuthManager,
}

fn harness(store: MemoryStore, browser_key: Option<&str>, cli_file: Option<PathBuf>) -> Harness {
    let transport = ScriptedTransport::new();
    let client = Arc::new(transport.client());
    let store = Arc::new(store);
    let cookie_calls = Arc::new(AtomicUsize::new(0));
    let cookies = FakeCookies {
        key: browser_key.map(String::from),
        calls: Arc::clone(&cookie_calls),
    };
    let auth = AuthManager::new(
        Arc::clone(&client),
        Arc::clone(&store) as Arc<dyn CredentialStore>,
        Box::new(cookies),
    )
    .with_cli_credentials_path(cli_file);
    Harness {
        transport,
        client,
        store,
        cookie_calls,
        auth,
    }
}

fn saved_config() -> Config {
    Config {
        session_key: "sk-ant-saved".to_string(),
        organization_id: "org-saved".to_string(),
        ..Config::default()
    }
}

#[test]
fn test_saved_key_is_used_first() {
    let h = harness(MemoryStore::new(saved_config()), Some("sk-ant-browser"), None);
    h.transport.push_response(200, ORGS_BODY);

    h.auth.initialize().unwrap();

    assert_eq!(h.client.session_key(), "sk-ant-saved");
    assert_eq!(h.client.organization_id(), "org-123");
    assert_eq!(h.store.get().organization_id, "org-123");
    assert_eq!(h.cookie_calls.load(Ordering::SeqCst), 0);
    assert!(h.auth.is_authenticated());
}

#[test]
fn test_rejected_saved_key_falls_back_to_browser() {
    let h = harness(MemoryStore::new(saved_config()), Some("sk-ant-browser"), None);
    h.transport.push_response(401, "{}");
    h.transport.push_response(200, ORGS_BODY);

    h.auth.initialize().unwrap();

    assert_eq!(h.client.session_key(), "sk-ant-browser");
    assert_eq!(h.store.get().session_key, "sk-ant-browser");
    assert_eq!(h.cookie_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.transport.request_count(), 2);
}

#[test]
fn test_no_browser_key_is_auth_failed() {
    let h = harness(MemoryStore::new(Config::default()), None, None);

    assert_eq!(h.auth.initialize(), Err(ApiError::AuthFailed));
    assert_eq!(h.transport.request_count(), 0);
    assert!(!h.auth.is_authenticated());
}

#[test]
fn test_cli_credentials_supply_org_id_only() {
    let temp = TempDir::new().unwrap();
    let cli_file = temp.path().join(".credentials.json");
    std::fs::write(
        &cli_file,
        r#"{"claudeAiOauth":{"accessToken":"sk-ant-oat01-token"},"organizationUuid":"org-cli"}"#,
    )
    .unwrap();
    let h = harness(MemoryStore::new(Config::default()), None, Some(cli_file));

    assert_eq!(h.auth.initialize(), Err(ApiError::AuthFailed));

    assert_eq!(h.client.organization_id(), "org-cli");
    assert_eq!(h.store.get().organization_id, "org-cli");
    assert_eq!(h.client.session_key(), "");
}

#[test]
fn test_unreadable_cli_credentials_are_ignored() {
    let temp = TempDir::new().unwrap();
    let cli_file = temp.path().join(".credentials.json");
    std::fs::write(&cli_file, "not json").unwrap();
    let h = harness(
        MemoryStore::new(Config::default()),
        Some("sk-ant-browser"),
        Some(cli_file),
    );
    h.transport.push_response(200, ORGS_BODY);

    h.auth.initialize().unwrap();
    assert_eq!(h.client.session_key(), "sk-ant-browser");
}

#[test]
fn test_browser_key_rejected_propagates_error() {
    let h = harness(MemoryStore::new(Config::default()), Some("sk-ant-browser"), None);
    h.transport.push_response(401, "{}");

    assert_eq!(h.auth.initialize(), Err(ApiError::Unauthorized));
    assert_eq!(h.store.get().session_key, "");
}

#[test]
fn test_empty_organization_list() {
    let h = harness(MemoryStore::new(Config::default()), None, None);
    h.transport.push_response(200, "[]");

    assert_eq!(
        h.auth.set_manual_session_key("sk-ant-manual"),
        Err(ApiError::NoOrganizations)
    );
    assert_eq!(h.client.session_key(), "");
}

#[test]
fn test_manual_key_failure_rolls_back() {
    let h = harness(MemoryStore::new(Config::default()), None, None);
    h.transport.push_response(403, "{}");

    assert_eq!(
        h.auth.set_manual_session_key("sk-ant-bad"),
        Err(ApiError::Unauthorized)
    );
    assert_eq!(h.client.session_key(), "");
    assert_eq!(h.store.get().session_key, "");
    assert_eq!(h.store.save_count(), 0);
}

#[test]
fn test_manual_key_success_persists() {
    let h = harness(MemoryStore::new(Config::default()), None, None);
    h.transport.push_response(200, ORGS_BODY);

    h.auth.set_manual_session_key("sk-ant-manual").unwrap();

    assert_eq!(h.client.session_key(), "sk-ant-manual");
    assert_eq!(h.store.get().session_key, "sk-ant-manual");
    assert_eq!(h.store.get().organization_id, "org-123");
}

#[test]
fn test_save_failures_do_not_fail_authentication() {
    let h = harness(MemoryStore::failing(Config::default()), None, None);
    h.transport.push_response(200, ORGS_BODY);

    assert!(h.auth.set_manual_session_key("sk-ant-manual").is_ok());
    assert!(h.auth.is_authenticated());
}

#[test]
fn test_refresh_from_browser() {
    let h = harness(MemoryStore::new(saved_config()), Some("sk-ant-fresh"), None);
    h.transport.push_response(200, ORGS_BODY);

    h.auth.refresh_from_browser().unwrap();
    assert_eq!(h.client.session_key(), "sk-ant-fresh");
    assert_eq!(h.store.get().session_key, "sk-ant-fresh");

    let h = harness(MemoryStore::new(saved_config()), None, None);
    assert_eq!(h.auth.refresh_from_browser(), Err(ApiError::AuthFailed));
}

#[test]
fn test_clear_credentials() {
    let h = harness(MemoryStore::new(saved_config()), None, None);
    h.transport.push_response(200, ORGS_BODY);
    h.auth.initialize().unwrap();

    h.auth.clear_credentials().unwrap();

    assert!(!h.auth.is_authenticated());
    assert_eq!(h.client.session_key(), "");
    assert_eq!(h.store.get().session_key, "");
    assert_eq!(h.store.get().organization_id, "");
}
