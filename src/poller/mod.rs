//! Periodic usage polling.
//!
//! [`Poller::fetch_usage`] performs one guarded fetch and maps the outcome to
//! overlay status, backoff and notifications. [`schedule::run`] drives it on
//! an interval that slows down while the user is idle.

pub mod notify;
pub mod schedule;

use crate::api::{ApiClient, ApiError, UsageSnapshot};
use crate::auth::AuthManager;
use crate::config::CredentialStore;
use crate::presentation::UiHandle;
use notify::{advance_threshold, session_body, weekly_body, Notifier, SESSION_TITLE, WEEKLY_TITLE};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// First rate-limit backoff; doubles per consecutive error up to 8x.
pub const BASE_BACKOFF_SECS: u64 = 30;

const MAX_BACKOFF_SHIFT: u32 = 3;

/// Consecutive errors before a generic failure is shown to the user.
const CONNECTION_ERROR_THRESHOLD: u32 = 3;

/// Backoff after the `consecutive_errors`-th error in a row: 30s, 60s, 120s,
/// then 240s.
pub fn backoff_for(consecutive_errors: u32) -> Duration {
    let shift = consecutive_errors.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
    Duration::from_secs(BASE_BACKOFF_SECS << shift)
}

/// Mutable polling state shared by the loop and manual refreshes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollingState {
    pub consecutive_errors: u32,
    /// Applied before the next fetch, then cleared.
    pub rate_limit_backoff: Option<Duration>,
    pub last_session_threshold: f64,
    pub last_weekly_threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No credentials installed; nothing was sent.
    Skipped,
    Updated(UsageSnapshot),
    Failed(ApiError),
}

pub type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;

pub struct Poller {
    client: Arc<ApiClient>,
    auth: Arc<AuthManager>,
    store: Arc<dyn CredentialStore>,
    ui: UiHandle,
    notifier: Box<dyn Notifier>,
    sleeper: Sleeper,
    state: Mutex<PollingState>,
    fetch_lock: Mutex<()>,
}

impl Poller {
    pub fn new(
        client: Arc<ApiClient>,
        auth: Arc<AuthManager>,
        store: Arc<dyn CredentialStore>,
        ui: UiHandle,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            client,
            auth,
            store,
            ui,
            notifier,
            sleeper: Box::new(std::thread::sleep),
            state: Mutex::new(PollingState::default()),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Replaces the blocking sleep used for rate-limit backoff.
    pub fn with_sleeper(mut self, sleeper: Sleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn state(&self) -> PollingState {
        self.lock_state().clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, PollingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetches usage once. Blocks for the network call and any pending
    /// backoff; concurrent callers are serialized.
    pub fn fetch_usage(&self) -> TickOutcome {
        let _fetching = self.fetch_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.auth.is_authenticated() {
            return TickOutcome::Skipped;
        }

        let backoff = self.lock_state().rate_limit_backoff.take();
        if let Some(backoff) = backoff {
            tracing::info!("Rate limit backoff: waiting {:?} before next fetch", backoff);
            (self.sleeper)(backoff);
        }

        match self.client.fetch_usage() {
            Ok(usage) => {
                self.on_success(&usage);
                TickOutcome::Updated(usage)
            }
            Err(err) => {
                self.on_error(&err);
                TickOutcome::Failed(err)
            }
        }
    }

    fn on_success(&self, usage: &UsageSnapshot) {
        {
            let mut state = self.lock_state();
            state.consecutive_errors = 0;
            state.rate_limit_backoff = None;
        }

        tracing::info!(
            "Usage fetched: 5h={:.0}%, weekly={:.0}%",
            usage.five_hour.utilization,
            usage.seven_day.utilization
        );
        self.ui.update_usage(usage.clone());
        self.check_and_notify(usage);
    }

    fn on_error(&self, err: &ApiError) {
        tracing::warn!("Failed to fetch usage: {}", err);

        let error_count = {
            let mut state = self.lock_state();
            state.consecutive_errors += 1;
            state.consecutive_errors
        };

        match err {
            ApiError::SessionExpired => {
                tracing::info!("Session key expired, attempting browser refresh...");
                self.ui.set_status("Session expired - refreshing...");
                if let Err(e) = self.auth.refresh_from_browser() {
                    tracing::warn!("Re-authentication failed: {}", e);
                    self.ui.set_status("Session expired - update key in Settings");
                }
            }
            ApiError::Unauthorized => {
                tracing::info!("Unauthorized, attempting browser refresh...");
                self.ui.set_status("Auth failed - refreshing...");
                if let Err(e) = self.auth.refresh_from_browser() {
                    tracing::warn!("Re-authentication failed: {}", e);
                    self.ui.set_status("Auth failed - update key in Settings");
                }
            }
            ApiError::RateLimited => {
                let backoff = backoff_for(error_count);
                self.lock_state().rate_limit_backoff = Some(backoff);
                tracing::info!("Rate limited, backing off {}s", backoff.as_secs());
                self.ui
                    .set_status(format!("Rate limited - retry in {}s", backoff.as_secs()));
            }
            ApiError::ServiceUnavailable => self.ui.set_status("Claude API unavailable"),
            _ => {
                if error_count >= CONNECTION_ERROR_THRESHOLD {
                    self.ui.set_status("Connection error - retrying...");
                }
            }
        }
    }

    /// Notifies once per threshold crossing for the session and weekly metrics.
    fn check_and_notify(&self, usage: &UsageSnapshot) {
        let config = self.store.get();
        if !config.notifications_enabled || config.alert_thresholds.is_empty() {
            return;
        }
        let thresholds = &config.alert_thresholds;

        let (session, weekly) = {
            let mut state = self.lock_state();
            (
                advance_threshold(
                    &mut state.last_session_threshold,
                    usage.five_hour.utilization,
                    thresholds,
                ),
                advance_threshold(
                    &mut state.last_weekly_threshold,
                    usage.seven_day.utilization,
                    thresholds,
                ),
            )
        };

        if let Some(threshold) = session {
            let utilization = usage.five_hour.utilization;
            self.notifier
                .notify(SESSION_TITLE, &session_body(utilization, threshold));
            tracing::info!(
                "Notification: session usage {:.0}% crossed {:.0}% threshold",
                utilization,
                threshold
            );
        }
        if let Some(threshold) = weekly {
            let utilization = usage.seven_day.utilization;
            self.notifier
                .notify(WEEKLY_TITLE, &weekly_body(utilization, threshold));
            tracing::info!(
                "Notification: weekly usage {:.0}% crossed {:.0}% threshold",
                utilization,
                threshold
            );
        }
    }
}

#[cfg(test)]
#[path = "tests/poller_tests.rs"]
mod tests;
