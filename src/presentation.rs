//! Overlay and tray rendering.
//!
//! Background work never touches UI state directly. It sends [`UiEvent`]s
//! through a [`UiHandle`]; a single [`Presenter`] task owns the overlay and
//! tray and applies events in order.

use crate::api::models::time_until_reset;
use crate::api::UsageSnapshot;
use crate::config::VisibleStats;
use crate::platform::{PlatformFeatures, SnapPosition};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;

const DEFAULT_OPACITY: f64 = 0.85;

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Status(String),
    Usage(UsageSnapshot),
    ShowOverlay,
    HideOverlay,
    Snap(SnapPosition),
    ShowSettings,
}

/// Cloneable sender usable from any thread.
#[derive(Clone)]
pub struct UiHandle {
    tx: mpsc::UnboundedSender<UiEvent>,
}

pub fn channel() -> (UiHandle, mpsc::UnboundedReceiver<UiEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UiHandle { tx }, rx)
}

impl UiHandle {
    pub fn send(&self, event: UiEvent) {
        // The presenter has exited during shutdown; nothing left to update.
        let _ = self.tx.send(event);
    }

    pub fn set_status(&self, text: impl Into<String>) {
        self.send(UiEvent::Status(text.into()));
    }

    pub fn update_usage(&self, usage: UsageSnapshot) {
        self.send(UiEvent::Usage(usage));
    }
}

pub trait Overlay: Send {
    fn set_status(&mut self, text: &str);
    fn update_usage(&mut self, usage: &UsageSnapshot);
    fn show(&mut self);
    fn hide(&mut self);
    fn is_visible(&self) -> bool;
    fn snap_to(&mut self, position: SnapPosition);
    /// Native window, if this overlay has one.
    fn window(&self) -> Option<crate::platform::WindowHandle> {
        None
    }
    /// Screen coordinates the native window moves to when snapped.
    fn snap_origin(&self, _position: SnapPosition) -> Option<(i32, i32)> {
        None
    }
}

pub trait Tray: Send {
    fn update_usage(&mut self, usage: &UsageSnapshot);
    fn set_overlay_state(&mut self, shown: bool);
}

/// Applies [`UiEvent`]s to the overlay and tray.
pub struct Presenter {
    overlay: Box<dyn Overlay>,
    tray: Box<dyn Tray>,
    platform: Arc<dyn PlatformFeatures>,
    opacity: f64,
}

impl Presenter {
    pub fn new(
        overlay: Box<dyn Overlay>,
        tray: Box<dyn Tray>,
        platform: Arc<dyn PlatformFeatures>,
        opacity: f64,
    ) -> Self {
        let opacity = if opacity <= 0.0 || opacity > 1.0 {
            DEFAULT_OPACITY
        } else {
            opacity
        };
        Self {
            overlay,
            tray,
            platform,
            opacity,
        }
    }

    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<UiEvent>) {
        while let Some(event) = rx.recv().await {
            self.apply(event);
        }
        tracing::debug!("Presenter stopped");
    }

    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Status(text) => self.overlay.set_status(&text),
            UiEvent::Usage(usage) => {
                self.overlay.update_usage(&usage);
                self.tray.update_usage(&usage);
            }
            UiEvent::ShowOverlay => self.show_overlay(),
            UiEvent::HideOverlay => {
                self.overlay.hide();
                self.tray.set_overlay_state(false);
            }
            UiEvent::Snap(position) => {
                self.overlay.snap_to(position);
                self.move_window_to(position);
                if !self.overlay.is_visible() {
                    self.show_overlay();
                }
            }
            UiEvent::ShowSettings => {
                tracing::info!("Update the session key with: claudebar --session-key <KEY>");
            }
        }
    }

    fn show_overlay(&mut self) {
        self.overlay.show();
        self.tray.set_overlay_state(true);
        self.apply_window_features();
    }

    fn move_window_to(&self, position: SnapPosition) {
        let (Some(window), Some((x, y))) = (self.overlay.window(), self.overlay.snap_origin(position))
        else {
            return;
        };
        if let Err(e) = self.platform.move_window(window, x, y) {
            tracing::debug!("Window positioning unavailable: {}", e);
        }
    }

    fn apply_window_features(&self) {
        let Some(window) = self.overlay.window() else {
            return;
        };
        if let Err(e) = self.platform.set_always_on_top(window, true) {
            tracing::debug!("Always-on-top unavailable: {}", e);
        }
        if let Err(e) = self.platform.set_transparency(window, self.opacity) {
            tracing::debug!("Transparency unavailable: {}", e);
        }
    }
}

/// One-line usage summary honoring the visible-stat toggles.
pub fn usage_summary(usage: &UsageSnapshot, visible: &VisibleStats, now: DateTime<Utc>) -> String {
    let mut parts = Vec::new();
    let stats = [
        (visible.session_usage, "Session", &usage.five_hour),
        (visible.weekly_usage, "Weekly", &usage.seven_day),
    ];
    for (shown, name, stat) in stats {
        if !shown {
            continue;
        }
        let mut part = format!("{} {:.0}%", name, stat.utilization);
        if let (true, Some(reset)) = (visible.reset_time, stat.resets_at) {
            part.push_str(&format!(" (resets {})", time_until_reset(reset, now)));
        }
        parts.push(part);
    }
    parts.join(" | ")
}

/// Tray menu labels for the session and weekly rows.
pub fn tray_labels(usage: &UsageSnapshot, now: DateTime<Utc>) -> [String; 2] {
    let reset = |at: Option<DateTime<Utc>>| at.map_or_else(|| "-".to_string(), |t| time_until_reset(t, now));
    [
        format!(
            "Session: {:.0}% (resets {})",
            usage.five_hour.utilization,
            reset(usage.five_hour.resets_at)
        ),
        format!(
            "Weekly: {:.0}% (resets {})",
            usage.seven_day.utilization,
            reset(usage.seven_day.resets_at)
        ),
    ]
}

/// Overlay rendered as lines on a terminal.
pub struct TerminalOverlay<W: Write + Send> {
    out: W,
    visible: bool,
    position: SnapPosition,
    visible_stats: VisibleStats,
    status: String,
}

impl<W: Write + Send> TerminalOverlay<W> {
    pub fn new(out: W, position: SnapPosition, visible_stats: VisibleStats) -> Self {
        Self {
            out,
            visible: false,
            position,
            visible_stats,
            status: String::new(),
        }
    }

    pub fn position(&self) -> SnapPosition {
        self.position
    }

    fn line(&mut self, text: &str) {
        if !self.visible {
            return;
        }
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|()| self.out.flush()) {
            tracing::debug!("Overlay write failed: {}", e);
        }
    }
}

impl<W: Write + Send> Overlay for TerminalOverlay<W> {
    fn set_status(&mut self, text: &str) {
        if self.status == text {
            return;
        }
        self.status = text.to_string();
        if !text.is_empty() {
            self.line(&format!("[claudebar] {}", text));
        }
    }

    fn update_usage(&mut self, usage: &UsageSnapshot) {
        self.status.clear();
        let summary = usage_summary(usage, &self.visible_stats, Utc::now());
        self.line(&format!("[claudebar] {}", summary));
    }

    fn show(&mut self) {
        self.visible = true;
        let text = format!("[claudebar] overlay shown ({})", self.position);
        self.line(&text);
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn snap_to(&mut self, position: SnapPosition) {
        self.position = position;
        tracing::debug!("Overlay snapped to {}", position);
    }
}

/// Tray stand-in that mirrors the menu labels into the log.
#[derive(Debug, Default)]
pub struct LogTray {
    labels: Option<[String; 2]>,
    overlay_shown: bool,
}

impl LogTray {
    pub fn toggle_label(&self) -> &'static str {
        if self.overlay_shown {
            "Hide Overlay"
        } else {
            "Show Overlay"
        }
    }

    pub fn labels(&self) -> Option<&[String; 2]> {
        self.labels.as_ref()
    }
}

impl Tray for LogTray {
    fn update_usage(&mut self, usage: &UsageSnapshot) {
        let labels = tray_labels(usage, Utc::now());
        tracing::debug!("Tray: {} | {}", labels[0], labels[1]);
        self.labels = Some(labels);
    }

    fn set_overlay_state(&mut self, shown: bool) {
        self.overlay_shown = shown;
        tracing::debug!("Tray menu: {}", self.toggle_label());
    }
}

#[cfg(test)]
#[path = "tests/presentation_tests.rs"]
mod tests;
