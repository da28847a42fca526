//! Persistent settings and saved credentials.

use crate::paths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Floor applied to the configured refresh interval.
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub session_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub organization_id: String,
    /// Seconds between polls while the user is active.
    pub refresh_interval: u64,
    pub overlay_enabled: bool,
    pub overlay_opacity: f64,
    /// One of "left", "right", "top", "floating", or a corner.
    pub overlay_position: String,
    pub overlay_x: i32,
    pub overlay_y: i32,
    pub visible_stats: VisibleStats,
    pub auto_start: bool,
    /// Utilization percentages that trigger a desktop notification.
    pub alert_thresholds: Vec<f64>,
    pub notifications_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_key: String::new(),
            organization_id: String::new(),
            refresh_interval: 60,
            overlay_enabled: true,
            overlay_opacity: 0.85,
            overlay_position: "top".to_string(),
            overlay_x: -1,
            overlay_y: -1,
            visible_stats: VisibleStats::default(),
            auto_start: false,
            alert_thresholds: vec![75.0, 90.0],
            notifications_enabled: true,
        }
    }
}

impl Config {
    /// Refresh interval with the minimum applied.
    pub fn normal_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_interval.max(MIN_REFRESH_INTERVAL_SECS))
    }
}

/// Which stats the overlay shows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct VisibleStats {
    pub session_usage: bool,
    pub daily_usage: bool,
    pub weekly_usage: bool,
    pub reset_time: bool,
}

impl Default for VisibleStats {
    fn default() -> Self {
        Self {
            session_usage: true,
            daily_usage: true,
            weekly_usage: true,
            reset_time: true,
        }
    }
}

/// Get/set/persist interface over the settings file.
///
/// Setters update the in-memory value before persisting, so a failed write
/// still leaves the new value visible to `get`.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Config;
    fn set_session_key(&self, key: &str) -> Result<()>;
    fn set_organization_id(&self, id: &str) -> Result<()>;
    fn set_overlay_enabled(&self, enabled: bool) -> Result<()>;
    fn clear_credentials(&self) -> Result<()>;
    fn save(&self) -> Result<()>;
}

/// JSON-file backed store.
pub struct JsonConfigStore {
    path: PathBuf,
    config: RwLock<Config>,
}

impl JsonConfigStore {
    /// Opens the store at the default location.
    pub fn open_default() -> Result<Self> {
        Ok(Self::open(paths::config_path()?))
    }

    /// Opens the store at `path`. A missing file yields defaults; an unreadable
    /// or corrupt one is logged and also yields defaults.
    pub fn open(path: PathBuf) -> Self {
        let config = match load_config(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Using default config: {:#}", e);
                Config::default()
            }
        };
        Self {
            path,
            config: RwLock::new(config),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update(&self, apply: impl FnOnce(&mut Config)) -> Result<()> {
        {
            let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
            apply(&mut config);
        }
        self.save()
    }
}

fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

impl CredentialStore for JsonConfigStore {
    fn get(&self) -> Config {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_session_key(&self, key: &str) -> Result<()> {
        self.update(|c| c.session_key = key.to_string())
    }

    fn set_organization_id(&self, id: &str) -> Result<()> {
        self.update(|c| c.organization_id = id.to_string())
    }

    fn set_overlay_enabled(&self, enabled: bool) -> Result<()> {
        self.update(|c| c.overlay_enabled = enabled)
    }

    fn clear_credentials(&self) -> Result<()> {
        self.update(|c| {
            c.session_key.clear();
            c.organization_id.clear();
        })
    }

    fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.get()).context("Failed to serialize config")?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        write_private(&self.path, &content)
            .with_context(|| format!("Failed to write config file: {}", self.path.display()))
    }
}

/// Writes `content` readable only by the current user.
#[cfg(unix)]
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(content.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    std::fs::write(path, content)
}

/// In-memory store for tests, optionally failing every save.
#[cfg(test)]
pub struct MemoryStore {
    config: RwLock<Config>,
    fail_saves: bool,
    saves: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new(config: Config) -> Self {
        Self {
            config: RwLock::new(config),
            fail_saves: false,
            saves: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn failing(config: Config) -> Self {
        Self {
            fail_saves: true,
            ..Self::new(config)
        }
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn update(&self, apply: impl FnOnce(&mut Config)) -> Result<()> {
        apply(&mut self.config.write().unwrap());
        self.save()
    }
}

#[cfg(test)]
impl CredentialStore for MemoryStore {
    fn get(&self) -> Config {
        self.config.read().unwrap().clone()
    }

    fn set_session_key(&self, key: &str) -> Result<()> {
        self.update(|c| c.session_key = key.to_string())
    }

    fn set_organization_id(&self, id: &str) -> Result<()> {
        self.update(|c| c.organization_id = id.to_string())
    }

    fn set_overlay_enabled(&self, enabled: bool) -> Result<()> {
        self.update(|c| c.overlay_enabled = enabled)
    }

    fn clear_credentials(&self) -> Result<()> {
        self.update(|c| {
            c.session_key.clear();
            c.organization_id.clear();
        })
    }

    fn save(&self) -> Result<()> {
        if self.fail_saves {
            anyhow::bail!("disk full");
        }
        self.saves.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
