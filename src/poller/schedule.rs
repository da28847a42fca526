//! Idle-aware refresh loop.

use super::Poller;
use crate::platform::PlatformFeatures;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Seconds without input after which the user counts as idle.
pub const IDLE_THRESHOLD_SECS: u64 = 300;

/// Poll period while idle.
pub const IDLE_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Active,
    Idle,
}

/// Tracks idle state across ticks and picks the poll period.
#[derive(Debug, Clone)]
pub struct Schedule {
    normal: Duration,
    idle: Duration,
    idle_threshold_secs: u64,
    mode: Mode,
}

impl Schedule {
    pub fn new(normal: Duration) -> Self {
        Self {
            normal,
            idle: IDLE_INTERVAL,
            idle_threshold_secs: IDLE_THRESHOLD_SECS,
            mode: Mode::Active,
        }
    }

    pub fn with_idle(mut self, threshold_secs: u64, interval: Duration) -> Self {
        self.idle_threshold_secs = threshold_secs;
        self.idle = interval;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Current poll period.
    pub fn period(&self) -> Duration {
        match self.mode {
            Mode::Active => self.normal,
            Mode::Idle => self.idle,
        }
    }

    /// Records an idle reading. Returns the new period when the mode changes.
    pub fn observe(&mut self, idle_secs: u64) -> Option<Duration> {
        let next = if idle_secs > self.idle_threshold_secs {
            Mode::Idle
        } else {
            Mode::Active
        };
        if next == self.mode {
            return None;
        }
        self.mode = next;
        Some(self.period())
    }
}

fn interval_after(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Polls until `stop` receives a message or its sender is dropped.
///
/// Every tick reads the idle time and fetches once. A fetch already in flight
/// when stop arrives is left to finish on the blocking pool.
pub async fn run(
    poller: Arc<Poller>,
    platform: Arc<dyn PlatformFeatures>,
    mut schedule: Schedule,
    mut stop: mpsc::Receiver<()>,
) {
    let mut interval = interval_after(schedule.period());
    tracing::debug!("Refresh loop started ({:?})", schedule.period());

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = stop.recv() => break,
        }

        let idle_platform = Arc::clone(&platform);
        let idle_secs = tokio::task::spawn_blocking(move || idle_platform.idle_seconds())
            .await
            .unwrap_or(0);

        if let Some(period) = schedule.observe(idle_secs) {
            match schedule.mode() {
                Mode::Idle => {
                    tracing::info!("User idle ({}s), reducing refresh rate", idle_secs)
                }
                Mode::Active => tracing::info!("User active, restoring normal refresh rate"),
            }
            interval = interval_after(period);
        }

        let fetch_poller = Arc::clone(&poller);
        let fetch = tokio::task::spawn_blocking(move || fetch_poller.fetch_usage());
        tokio::select! {
            result = fetch => {
                if let Err(e) = result {
                    tracing::warn!("Usage fetch task failed: {}", e);
                }
            }
            _ = stop.recv() => break,
        }
    }

    tracing::debug!("Refresh loop stopped");
}
