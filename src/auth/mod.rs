//! Credential acquisition: saved config, then the Claude Code CLI's org id,
//! then browser cookies.

pub mod cli_credentials;

use crate::api::transport::redact;
use crate::api::{ApiClient, ApiError};
use crate::config::CredentialStore;
use crate::cookies::SessionKeySource;
use std::path::PathBuf;
use std::sync::Arc;

pub struct AuthManager {
    client: Arc<ApiClient>,
    store: Arc<dyn CredentialStore>,
    cookies: Box<dyn SessionKeySource>,
    cli_credentials: Option<PathBuf>,
}

impl AuthManager {
    pub fn new(
        client: Arc<ApiClient>,
        store: Arc<dyn CredentialStore>,
        cookies: Box<dyn SessionKeySource>,
    ) -> Self {
        Self {
            client,
            store,
            cookies,
            cli_credentials: cli_credentials::default_path(),
        }
    }

    pub fn with_cli_credentials_path(mut self, path: Option<PathBuf>) -> Self {
        self.cli_credentials = path;
        self
    }

    /// Resolves a working credential from the first source that yields one.
    pub fn initialize(&self) -> Result<(), ApiError> {
        let config = self.store.get();
        if !config.session_key.is_empty() {
            self.client.set_session_key(&config.session_key);
            if !config.organization_id.is_empty() {
                self.client.set_organization_id(&config.organization_id);
            }
            match self.verify_and_fetch_org() {
                Ok(()) => {
                    tracing::info!("Authenticated using saved session key");
                    return Ok(());
                }
                Err(e) => tracing::info!("Saved session key rejected ({}), trying other sources", e),
            }
        }

        self.try_cli_organization();

        let session_key = match self.cookies.extract_session_key() {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Failed to extract session key from browser: {}", e);
                tracing::info!(
                    "Set the session key in Settings (DevTools > Application > Cookies > claude.ai > sessionKey)"
                );
                return Err(ApiError::AuthFailed);
            }
        };

        self.client.set_session_key(&session_key);
        self.verify_and_fetch_org()?;
        self.persist_session_key(&session_key);
        tracing::info!(
            "Authenticated from browser cookies ({})",
            redact(&session_key)
        );
        Ok(())
    }

    /// Installs a user-supplied key. A rejected key is removed from the client.
    pub fn set_manual_session_key(&self, key: &str) -> Result<(), ApiError> {
        self.client.set_session_key(key);
        if let Err(e) = self.verify_and_fetch_org() {
            self.client.set_session_key("");
            return Err(e);
        }
        self.persist_session_key(key);
        Ok(())
    }

    /// Re-reads browser cookies after the live session was rejected.
    pub fn refresh_from_browser(&self) -> Result<(), ApiError> {
        let session_key = self.cookies.extract_session_key().map_err(|e| {
            tracing::warn!("Browser refresh failed: {}", e);
            ApiError::AuthFailed
        })?;
        self.client.set_session_key(&session_key);
        self.verify_and_fetch_org()?;
        self.persist_session_key(&session_key);
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.has_credentials()
    }

    /// Forgets the credential in memory and on disk.
    pub fn clear_credentials(&self) -> anyhow::Result<()> {
        self.client.set_session_key("");
        self.client.set_organization_id("");
        self.store.clear_credentials()
    }

    /// Confirms the installed key and adopts the first organization it lists.
    fn verify_and_fetch_org(&self) -> Result<(), ApiError> {
        let orgs = self.client.fetch_organizations()?;
        let org = orgs.first().ok_or(ApiError::NoOrganizations)?;
        self.client.set_organization_id(&org.id);
        if let Err(e) = self.store.set_organization_id(&org.id) {
            tracing::warn!("Failed to save organization ID: {:#}", e);
        }
        Ok(())
    }

    fn try_cli_organization(&self) {
        let Some(path) = &self.cli_credentials else {
            return;
        };
        match cli_credentials::read_organization_id(path) {
            Ok(Some(org_id)) => {
                tracing::info!("Found organization UUID from Claude Code: {}", org_id);
                self.client.set_organization_id(&org_id);
                if let Err(e) = self.store.set_organization_id(&org_id) {
                    tracing::warn!("Failed to save organization ID: {:#}", e);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::debug!("Claude Code credentials unusable: {:#}", e),
        }
    }

    fn persist_session_key(&self, key: &str) {
        if let Err(e) = self.store.set_session_key(key) {
            tracing::warn!("Failed to save session key: {:#}", e);
        }
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
