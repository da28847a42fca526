//! Chromium cookie store: `Local State` key plus per-profile `Cookies` DBs.

use super::{is_valid_session_key, sqlite, CookieError, KeyUnwrapper};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use std::path::{Path, PathBuf};

pub const PROFILES: [&str; 4] = ["Default", "Profile 1", "Profile 2", "Profile 3"];

const DPAPI_PREFIX_LEN: usize = 5;
const VERSION_LEN: usize = 3;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

const COOKIE_QUERY: &str = "SELECT name, encrypted_value, value FROM cookies \
     WHERE host_key LIKE '%claude.ai%' ORDER BY last_access_utc DESC";

struct CookieRow {
    name: String,
    encrypted: Vec<u8>,
    plain: String,
}

/// Searches every known profile under `user_data` for a session key.
pub fn extract(user_data: &Path, unwrap_key: KeyUnwrapper) -> Result<String, CookieError> {
    let key = match encryption_key(user_data, unwrap_key) {
        Ok(key) => Some(key),
        Err(e) => {
            tracing::debug!("Encryption key unavailable: {}", e);
            None
        }
    };

    for profile in PROFILES {
        let Some(db_path) = cookie_db_path(&user_data.join(profile)) else {
            continue;
        };
        tracing::debug!("Trying profile {}", profile);
        match read_cookie_db(&db_path, key.as_deref()) {
            Ok(session_key) => return Ok(session_key),
            Err(e) => tracing::debug!("{}: {}", profile, e),
        }
    }
    Err(CookieError::NotFound)
}

fn cookie_db_path(profile_dir: &Path) -> Option<PathBuf> {
    [
        profile_dir.join("Network").join("Cookies"),
        profile_dir.join("Cookies"),
    ]
    .into_iter()
    .find(|p| p.exists())
}

/// Reads `os_crypt.encrypted_key` from `Local State` and unwraps it.
pub fn encryption_key(user_data: &Path, unwrap_key: KeyUnwrapper) -> Result<Vec<u8>, CookieError> {
    let content = std::fs::read_to_string(user_data.join("Local State"))?;
    let state: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| CookieError::KeyUnavailable(format!("invalid Local State: {}", e)))?;
    let encoded = state["os_crypt"]["encrypted_key"]
        .as_str()
        .ok_or_else(|| CookieError::KeyUnavailable("encrypted_key not found".to_string()))?;
    let wrapped = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| CookieError::KeyUnavailable(format!("bad encrypted_key: {}", e)))?;
    let Some(wrapped) = wrapped.get(DPAPI_PREFIX_LEN..) else {
        return Err(CookieError::KeyUnavailable(
            "encrypted_key too short".to_string(),
        ));
    };
    unwrap_key(wrapped)
}

fn read_cookie_db(path: &Path, key: Option<&[u8]>) -> Result<String, CookieError> {
    let db = sqlite::open(path)?;
    let mut stmt = db.conn.prepare(COOKIE_QUERY)?;
    let rows: Vec<CookieRow> = stmt
        .query_map([], |row| {
            Ok(CookieRow {
                name: row.get(0)?,
                encrypted: row.get::<_, Option<Vec<u8>>>(1)?.unwrap_or_default(),
                plain: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        })?
        .filter_map(Result::ok)
        .collect();

    let mut last_err = None;
    for row in rows {
        tracing::debug!(
            "Found cookie {} (encrypted={} bytes, plain={} bytes)",
            row.name,
            row.encrypted.len(),
            row.plain.len()
        );
        if !row.plain.is_empty() && is_valid_session_key(&row.plain) {
            return Ok(row.plain);
        }
        let Some(key) = key else { continue };
        if row.encrypted.is_empty() {
            continue;
        }
        match decrypt_value(&row.encrypted, key) {
            Ok(value) if is_valid_session_key(&value) => return Ok(value),
            Ok(value) if row.name == "sessionKey" && value.len() > 20 => return Ok(value),
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("Decrypt failed for {}: {}", row.name, e);
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or(CookieError::NotFound))
}

/// Decrypts one `encrypted_value` blob.
///
/// `v10`/`v11` are AES-256-GCM with a 12-byte nonce after the version tag.
/// `v20` is App-Bound Encryption and cannot be decrypted by a third party.
/// Anything else is handed to the platform key store as a whole.
pub fn decrypt_value(encrypted: &[u8], key: &[u8]) -> Result<String, CookieError> {
    let Some(version) = encrypted.get(..VERSION_LEN) else {
        return Err(CookieError::DecryptFailed(
            "encrypted value too short".to_string(),
        ));
    };
    match version {
        b"v20" => Err(CookieError::AppBoundEncryption),
        b"v10" | b"v11" => {
            if encrypted.len() < VERSION_LEN + NONCE_LEN + TAG_LEN {
                return Err(CookieError::DecryptFailed(
                    "encrypted value too short for AES-GCM".to_string(),
                ));
            }
            let (nonce, ciphertext) = encrypted[VERSION_LEN..].split_at(NONCE_LEN);
            let cipher = Aes256Gcm::new_from_slice(key)
                .map_err(|e| CookieError::DecryptFailed(format!("bad key: {}", e)))?;
            let plain = cipher
                .decrypt(Nonce::from_slice(nonce), ciphertext)
                .map_err(|e| CookieError::DecryptFailed(format!("AES-GCM: {}", e)))?;
            Ok(String::from_utf8_lossy(&plain).into_owned())
        }
        _ => {
            let plain = super::unwrap_platform_key(encrypted)?;
            Ok(String::from_utf8_lossy(&plain).into_owned())
        }
    }
}
