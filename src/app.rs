//! Application wiring.
//!
//! Every long-lived component is built once in [`App::new`] and shared by
//! handle. UI changes go through the presentation channel only.

use crate::api::transport::{HttpTransport, UreqTransport};
use crate::api::{ApiClient, ApiError};
use crate::auth::{cli_credentials, AuthManager};
use crate::config::CredentialStore;
use crate::cookies::{CookieExtractor, SessionKeySource};
use crate::hotkeys::HotkeyManager;
use crate::platform::{self, PlatformFeatures, SnapPosition};
use crate::poller::notify::{DesktopNotifier, Notifier};
use crate::poller::schedule::{self, Schedule};
use crate::poller::{Poller, TickOutcome};
use crate::presentation::{UiEvent, UiHandle};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// External collaborators the app is assembled from.
pub struct AppParts {
    pub store: Arc<dyn CredentialStore>,
    pub transport: Box<dyn HttpTransport>,
    pub cookies: Box<dyn SessionKeySource>,
    pub platform: Arc<dyn PlatformFeatures>,
    pub notifier: Box<dyn Notifier>,
    pub cli_credentials: Option<PathBuf>,
}

impl AppParts {
    /// Real network, browser, OS and notification backends.
    pub fn system(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            transport: Box::new(UreqTransport::default()),
            cookies: Box::new(CookieExtractor::for_current_platform()),
            platform: platform::detect(),
            notifier: Box::new(DesktopNotifier),
            cli_credentials: cli_credentials::default_path(),
        }
    }
}

pub struct App {
    store: Arc<dyn CredentialStore>,
    client: Arc<ApiClient>,
    auth: Arc<AuthManager>,
    poller: Arc<Poller>,
    platform: Arc<dyn PlatformFeatures>,
    hotkeys: Arc<HotkeyManager>,
    ui: UiHandle,
    overlay_visible: AtomicBool,
    running: AtomicBool,
    stop_tx: Mutex<Option<mpsc::Sender<()>>>,
    stop_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

impl App {
    pub fn new(parts: AppParts, ui: UiHandle) -> Arc<Self> {
        let client = Arc::new(ApiClient::new(parts.transport));
        let auth = Arc::new(
            AuthManager::new(Arc::clone(&client), Arc::clone(&parts.store), parts.cookies)
                .with_cli_credentials_path(parts.cli_credentials),
        );
        let poller = Arc::new(Poller::new(
            Arc::clone(&client),
            Arc::clone(&auth),
            Arc::clone(&parts.store),
            ui.clone(),
            parts.notifier,
        ));
        let hotkeys = Arc::new(HotkeyManager::new(Arc::clone(&parts.platform)));
        let (stop_tx, stop_rx) = mpsc::channel(1);

        Arc::new(Self {
            store: parts.store,
            client,
            auth,
            poller,
            platform: parts.platform,
            hotkeys,
            ui,
            overlay_visible: AtomicBool::new(false),
            running: AtomicBool::new(false),
            stop_tx: Mutex::new(Some(stop_tx)),
            stop_rx: Mutex::new(Some(stop_rx)),
        })
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn poller(&self) -> &Arc<Poller> {
        &self.poller
    }

    pub fn platform(&self) -> Arc<dyn PlatformFeatures> {
        Arc::clone(&self.platform)
    }

    pub fn is_overlay_visible(&self) -> bool {
        self.overlay_visible.load(Ordering::SeqCst)
    }

    /// Shows the overlay, registers hotkeys, authenticates in the background
    /// and starts the refresh loop. Returns the loop's task handle, or `None`
    /// if the app was already started.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let stop_rx = self
            .stop_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        self.running.store(true, Ordering::SeqCst);

        let config = self.store.get();
        if config.overlay_enabled {
            self.overlay_visible.store(true, Ordering::SeqCst);
            self.ui.send(UiEvent::ShowOverlay);
        }

        let app = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = app.authenticate() {
                tracing::debug!("Startup authentication failed: {}", e);
            }
        });

        self.install_hotkeys();

        let schedule = Schedule::new(config.normal_interval());
        Some(tokio::spawn(schedule::run(
            Arc::clone(&self.poller),
            Arc::clone(&self.platform),
            schedule,
            stop_rx,
        )))
    }

    fn install_hotkeys(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.hotkeys.set_snap_callback(Arc::new(move |position| {
            if let Some(app) = weak.upgrade() {
                app.handle_snap_hotkey(position);
            }
        }));
        let weak: Weak<Self> = Arc::downgrade(self);
        self.hotkeys.set_toggle_callback(Arc::new(move || {
            if let Some(app) = weak.upgrade() {
                app.handle_toggle_hotkey();
            }
        }));
        self.hotkeys.start();
    }

    /// Resolves credentials and performs the first fetch. Blocking.
    pub fn authenticate(&self) -> Result<TickOutcome, ApiError> {
        tracing::info!("Attempting authentication...");
        self.ui.set_status("Authenticating...");

        if let Err(e) = self.auth.initialize() {
            tracing::warn!("Authentication failed: {}", e);
            tracing::info!("Please set session key in Settings");
            self.ui.set_status("Set session key in Settings");
            return Err(e);
        }

        tracing::info!("Authentication successful");
        self.ui.set_status("Fetching usage...");
        Ok(self.poller.fetch_usage())
    }

    /// Verifies and saves a user-supplied session key. Blocking.
    pub fn set_session_key(&self, key: &str) -> Result<(), ApiError> {
        self.auth.set_manual_session_key(key)
    }

    /// Removes saved credentials.
    pub fn logout(&self) -> anyhow::Result<()> {
        self.auth.clear_credentials()
    }

    /// Fetches once outside the schedule.
    pub fn refresh_now(&self) -> JoinHandle<TickOutcome> {
        let poller = Arc::clone(&self.poller);
        tokio::task::spawn_blocking(move || poller.fetch_usage())
    }

    pub fn show_overlay(&self) {
        self.ui.send(UiEvent::ShowOverlay);
        self.set_overlay_enabled(true);
    }

    pub fn hide_overlay(&self) {
        self.ui.send(UiEvent::HideOverlay);
        self.set_overlay_enabled(false);
    }

    fn set_overlay_enabled(&self, enabled: bool) {
        self.overlay_visible.store(enabled, Ordering::SeqCst);
        if let Err(e) = self.store.set_overlay_enabled(enabled) {
            tracing::warn!("Failed to save overlay state: {:#}", e);
        }
    }

    /// Moves the overlay. The presenter also reveals a hidden overlay on
    /// snap, so only the saved state is updated here.
    pub fn handle_snap_hotkey(&self, position: SnapPosition) {
        tracing::info!("Snap hotkey: {}", position);
        self.ui.send(UiEvent::Snap(position));
        if !self.is_overlay_visible() {
            self.set_overlay_enabled(true);
        }
    }

    pub fn handle_toggle_hotkey(&self) {
        tracing::info!("Toggle hotkey: opening settings");
        self.ui.send(UiEvent::ShowSettings);
    }

    /// Stops the refresh loop and hotkey listener. Idempotent.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Shutting down...");
        self.stop_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.hotkeys.stop();
        tracing::info!("Shutdown complete");
    }
}
