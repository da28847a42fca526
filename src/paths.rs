//! Filesystem locations used by claudebar.
//!
//! - `config.json` - settings and saved credentials
//! - `claudebar.log` - application log

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Overrides the config directory (used by tests and portable installs).
pub const CONFIG_DIR_ENV: &str = "CLAUDEBAR_CONFIG_DIR";

#[cfg(any(target_os = "windows", target_os = "macos"))]
const APP_DIR: &str = "ClaudeBar";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const APP_DIR: &str = "claudebar";

/// Returns the application config directory, creating it if needed.
///
/// - Windows: `%APPDATA%\ClaudeBar`
/// - macOS: `~/Library/Application Support/ClaudeBar`
/// - Linux: `$XDG_CONFIG_HOME/claudebar` (or `~/.config/claudebar`)
pub fn config_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::config_dir()
            .context("Could not determine config directory")?
            .join(APP_DIR),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    Ok(dir)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

pub fn log_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("claudebar.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_config_dir_env_override() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("nested").join("cfg");
        std::env::set_var(CONFIG_DIR_ENV, &target);

        let dir = config_dir().unwrap();
        let config = config_path().unwrap();
        let log = log_path().unwrap();

        std::env::remove_var(CONFIG_DIR_ENV);

        assert_eq!(dir, target);
        assert!(dir.is_dir());
        assert_eq!(config, target.join("config.json"));
        assert_eq!(log, target.join("claudebar.log"));
    }
}
