//! Session key extraction from installed browsers' cookie stores.
//!
//! Chromium-family browsers are tried first (every known profile of each),
//! then Firefox. The first value that looks like a session key wins.

mod chromium;
mod firefox;
mod keyring;
mod sqlite;

use std::path::PathBuf;
use thiserror::Error;

pub use keyring::unwrap_platform_key;

#[derive(Debug, Error)]
pub enum CookieError {
    #[error("claude.ai session cookie not found")]
    NotFound,
    #[error("failed to decrypt cookie value: {0}")]
    DecryptFailed(String),
    #[error(
        "cookie uses Chrome App-Bound Encryption (v20); paste the session key manually in Settings"
    )]
    AppBoundEncryption,
    #[error("browser encryption key unavailable: {0}")]
    KeyUnavailable(String),
    #[error("cookie database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that can produce a session key for the auth manager.
pub trait SessionKeySource: Send + Sync {
    fn extract_session_key(&self) -> Result<String, CookieError>;
}

/// Recovers the raw AES key wrapped in a Chromium `Local State` file.
pub type KeyUnwrapper = fn(&[u8]) -> Result<Vec<u8>, CookieError>;

/// A Chromium-family browser's user-data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserInfo {
    pub name: &'static str,
    pub user_data: PathBuf,
}

impl BrowserInfo {
    fn new(name: &'static str, user_data: PathBuf) -> Self {
        Self { name, user_data }
    }
}

pub struct CookieExtractor {
    chromium: Vec<BrowserInfo>,
    firefox_profiles: Option<PathBuf>,
    unwrap_key: KeyUnwrapper,
}

impl CookieExtractor {
    pub fn new(
        chromium: Vec<BrowserInfo>,
        firefox_profiles: Option<PathBuf>,
        unwrap_key: KeyUnwrapper,
    ) -> Self {
        Self {
            chromium,
            firefox_profiles,
            unwrap_key,
        }
    }

    /// Extractor over the current OS's standard browser locations.
    pub fn for_current_platform() -> Self {
        Self::new(
            default_chromium_browsers(),
            default_firefox_profiles(),
            unwrap_platform_key,
        )
    }

    pub fn browsers(&self) -> &[BrowserInfo] {
        &self.chromium
    }
}

impl SessionKeySource for CookieExtractor {
    fn extract_session_key(&self) -> Result<String, CookieError> {
        for browser in &self.chromium {
            if !browser.user_data.exists() {
                continue;
            }
            tracing::debug!("Trying {} at {}", browser.name, browser.user_data.display());
            match chromium::extract(&browser.user_data, self.unwrap_key) {
                Ok(key) => {
                    tracing::info!("Found session key in {}", browser.name);
                    return Ok(key);
                }
                Err(e) => tracing::debug!("{}: {}", browser.name, e),
            }
        }

        if let Some(dir) = &self.firefox_profiles {
            match firefox::extract(dir) {
                Ok(key) => {
                    tracing::info!("Found session key in Firefox");
                    return Ok(key);
                }
                Err(e) => tracing::debug!("Firefox: {}", e),
            }
        }

        Err(CookieError::NotFound)
    }
}

/// True for `sk-ant-` keys and for three-part dotted tokens over 100 chars.
pub fn is_valid_session_key(value: &str) -> bool {
    if value.starts_with("sk-ant-") {
        return true;
    }
    value.split('.').count() == 3 && value.len() > 100
}

#[cfg(target_os = "windows")]
fn default_chromium_browsers() -> Vec<BrowserInfo> {
    let Some(local) = dirs::data_local_dir() else {
        return Vec::new();
    };
    vec![
        BrowserInfo::new("Chrome", local.join("Google").join("Chrome").join("User Data")),
        BrowserInfo::new("Edge", local.join("Microsoft").join("Edge").join("User Data")),
        BrowserInfo::new(
            "Brave",
            local.join("BraveSoftware").join("Brave-Browser").join("User Data"),
        ),
    ]
}

#[cfg(target_os = "macos")]
fn default_chromium_browsers() -> Vec<BrowserInfo> {
    let Some(support) = dirs::config_dir() else {
        return Vec::new();
    };
    vec![
        BrowserInfo::new("Chrome", support.join("Google").join("Chrome")),
        BrowserInfo::new("Chromium", support.join("Chromium")),
        BrowserInfo::new("Brave", support.join("BraveSoftware").join("Brave-Browser")),
        BrowserInfo::new("Edge", support.join("Microsoft Edge")),
    ]
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn default_chromium_browsers() -> Vec<BrowserInfo> {
    let Some(config) = dirs::config_dir() else {
        return Vec::new();
    };
    vec![
        BrowserInfo::new("Chrome", config.join("google-chrome")),
        BrowserInfo::new("Chromium", config.join("chromium")),
        BrowserInfo::new("Brave", config.join("BraveSoftware").join("Brave-Browser")),
        BrowserInfo::new("Edge", config.join("microsoft-edge")),
    ]
}

#[cfg(target_os = "windows")]
fn default_firefox_profiles() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("Mozilla").join("Firefox").join("Profiles"))
}

#[cfg(target_os = "macos")]
fn default_firefox_profiles() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("Firefox").join("Profiles"))
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn default_firefox_profiles() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".mozilla").join("firefox"))
}

#[cfg(test)]
pub(crate) mod fixtures;

#[cfg(test)]
#[path = "tests/cookies_tests.rs"]
mod tests;
