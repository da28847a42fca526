//! Opening cookie databases that a running browser may hold locked.

use super::CookieError;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tempfile::TempDir;

/// An open cookie database, plus the temp copy backing it if one was needed.
pub struct CookieDb {
    pub conn: Connection,
    _copy: Option<TempDir>,
}

/// Opens `path` read-only and immutable; if that fails, opens a private copy.
pub fn open(path: &Path) -> Result<CookieDb, CookieError> {
    match open_immutable(path) {
        Ok(conn) => {
            tracing::debug!("Opened {} with immutable flag", path.display());
            return Ok(CookieDb { conn, _copy: None });
        }
        Err(e) => tracing::debug!("Immutable open of {} failed: {}", path.display(), e),
    }

    let dir = tempfile::Builder::new()
        .prefix("claudebar_cookies_")
        .tempdir()?;
    let copy = dir.path().join("Cookies");
    std::fs::copy(path, &copy)?;
    let conn = Connection::open_with_flags(&copy, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    tracing::debug!("Opened {} via temp copy", path.display());
    Ok(CookieDb {
        conn,
        _copy: Some(dir),
    })
}

fn open_immutable(path: &Path) -> Result<Connection, rusqlite::Error> {
    let uri = format!("file:{}?mode=ro&immutable=1", uri_path(path));
    let conn = Connection::open_with_flags(
        uri,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
    )?;
    // Opening is lazy; touch the schema so a locked or missing file fails here.
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
        row.get::<_, i64>(0)
    })?;
    Ok(conn)
}

fn uri_path(path: &Path) -> String {
    let mut out = String::new();
    for c in path.to_string_lossy().chars() {
        match c {
            '\\' => out.push('/'),
            '%' => out.push_str("%25"),
            '?' => out.push_str("%3f"),
            '#' => out.push_str("%23"),
            _ => out.push(c),
        }
    }
    out
}
