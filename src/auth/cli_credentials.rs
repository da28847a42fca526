//! Organization id from the Claude Code CLI's credentials file.
//!
//! The file's OAuth access token is not a web session credential and is
//! never read; only `organizationUuid` is trusted.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct CliCredentials {
    #[serde(rename = "organizationUuid", default)]
    organization_uuid: String,
}

/// `$CLAUDE_CONFIG_DIR/.credentials.json`, else `~/.claude/.credentials.json`.
pub fn default_path() -> Option<PathBuf> {
    let config_dir = std::env::var("CLAUDE_CONFIG_DIR")
        .map(PathBuf::from)
        .ok()
        .or_else(|| dirs::home_dir().map(|h| h.join(".claude")))?;
    Some(config_dir.join(".credentials.json"))
}

/// Returns the organization UUID if the file exists and names one.
pub fn read_organization_id(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let creds: CliCredentials = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(creds.organization_uuid).filter(|id| !id.is_empty()))
}
