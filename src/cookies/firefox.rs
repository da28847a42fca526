//! Firefox stores cookies unencrypted in `cookies.sqlite`.

use super::{is_valid_session_key, sqlite, CookieError};
use std::path::Path;

const COOKIE_QUERY: &str = "SELECT name, value FROM moz_cookies \
     WHERE host LIKE '%claude.ai%' AND (name = 'sessionKey' OR name LIKE '%session%')";

pub fn extract(profiles_dir: &Path) -> Result<String, CookieError> {
    for entry in std::fs::read_dir(profiles_dir)? {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_ok_and(|t| t.is_dir()) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.contains(".default") && !name.contains("default-release") {
            continue;
        }
        let db_path = entry.path().join("cookies.sqlite");
        if !db_path.exists() {
            continue;
        }
        match read_profile(&db_path) {
            Ok(Some(key)) => return Ok(key),
            Ok(None) => {}
            Err(e) => tracing::debug!("Firefox profile {}: {}", name, e),
        }
    }
    Err(CookieError::NotFound)
}

fn read_profile(db_path: &Path) -> Result<Option<String>, CookieError> {
    let db = sqlite::open(db_path)?;
    let mut stmt = db.conn.prepare(COOKIE_QUERY)?;
    let key = stmt
        .query_map([], |row| row.get::<_, Option<String>>(1))?
        .filter_map(Result::ok)
        .flatten()
        .find(|value| is_valid_session_key(value));
    Ok(key)
}
