//! On-disk browser profiles for cookie extraction tests.

use super::CookieError;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use rusqlite::{params, Connection};
use std::path::Path;

pub const TEST_KEY: [u8; 32] = [7u8; 32];

/// Key "unwrapping" that returns the input unchanged.
pub fn passthrough_key(data: &[u8]) -> Result<Vec<u8>, CookieError> {
    Ok(data.to_vec())
}

pub fn failing_key(_data: &[u8]) -> Result<Vec<u8>, CookieError> {
    Err(CookieError::KeyUnavailable("no keyring".to_string()))
}

/// Writes `Local State` whose key unwraps to [`TEST_KEY`] under [`passthrough_key`].
pub fn write_local_state(user_data: &Path) {
    std::fs::create_dir_all(user_data).unwrap();
    let mut wrapped = b"DPAPI".to_vec();
    wrapped.extend_from_slice(&TEST_KEY);
    let encoded = base64::engine::general_purpose::STANDARD.encode(wrapped);
    let state = serde_json::json!({ "os_crypt": { "encrypted_key": encoded } });
    std::fs::write(user_data.join("Local State"), state.to_string()).unwrap();
}

/// Encrypts `plain` the way Chromium stores a `v10` cookie.
pub fn encrypt_v10(plain: &str) -> Vec<u8> {
    let nonce = [3u8; 12];
    let cipher = Aes256Gcm::new_from_slice(&TEST_KEY).unwrap();
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plain.as_bytes())
        .unwrap();
    let mut out = b"v10".to_vec();
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    out
}

pub struct ChromiumCookie<'a> {
    pub host: &'a str,
    pub name: &'a str,
    pub value: &'a str,
    pub encrypted: Vec<u8>,
    pub last_access: i64,
}

/// Creates `<profile_dir>/<relative>` as a Chromium cookie DB holding `cookies`.
pub fn write_chromium_db(db_path: &Path, cookies: &[ChromiumCookie<'_>]) {
    std::fs::create_dir_all(db_path.parent().unwrap()).unwrap();
    let conn = Connection::open(db_path).unwrap();
    conn.execute_batch(
        "CREATE TABLE cookies (host_key TEXT, name TEXT, value TEXT, \
         encrypted_value BLOB, last_access_utc INTEGER)",
    )
    .unwrap();
    for c in cookies {
        conn.execute(
            "INSERT INTO cookies VALUES (?1, ?2, ?3, ?4, ?5)",
            params![c.host, c.name, c.value, c.encrypted, c.last_access],
        )
        .unwrap();
    }
}

pub fn write_firefox_db(db_path: &Path, cookies: &[(&str, &str, &str)]) {
    std::fs::create_dir_all(db_path.parent().unwrap()).unwrap();
    let conn = Connection::open(db_path).unwrap();
    conn.execute_batch("CREATE TABLE moz_cookies (host TEXT, name TEXT, value TEXT)")
        .unwrap();
    for (host, name, value) in cookies {
        conn.execute(
            "INSERT INTO moz_cookies VALUES (?1, ?2, ?3)",
            params![host, name, value],
        )
        .unwrap();
    }
}

/// A dotted token long enough to pass session-key validation.
pub fn long_token() -> String {
    format!("{}.{}.{}", "a".repeat(40), "b".repeat(40), "c".repeat(40))
}
