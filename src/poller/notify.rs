//! Desktop notifications when usage crosses an alert threshold.

use std::sync::Once;

pub const SESSION_TITLE: &str = "ClaudeBar: High Session Usage";
pub const WEEKLY_TITLE: &str = "ClaudeBar: High Weekly Usage";

pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

/// Sends notifications through the OS notification service.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

static MACOS_APP_INIT: Once = Once::new();

fn ensure_initialized() {
    MACOS_APP_INIT.call_once(|| {
        #[cfg(target_os = "macos")]
        {
            // No app bundle; notifications are attributed to Terminal.
            if let Err(e) = notify_rust::set_application("com.apple.Terminal") {
                tracing::warn!("Failed to set notification application: {}", e);
            }
        }
    });
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) {
        ensure_initialized();
        if let Err(e) = notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .timeout(notify_rust::Timeout::Milliseconds(5000))
            .show()
        {
            tracing::warn!("Could not send notification: {}", e);
        }
    }
}

/// The largest threshold `utilization` meets or exceeds, or 0 if none.
pub fn highest_crossed_threshold(utilization: f64, thresholds: &[f64]) -> f64 {
    thresholds
        .iter()
        .copied()
        .filter(|t| utilization >= *t)
        .fold(0.0, f64::max)
}

/// Advances one metric's high-water mark.
///
/// Returns the threshold to announce when a higher one is crossed. When usage
/// falls below the recorded threshold the mark drops with it, so the same
/// threshold fires again on the next crossing.
pub fn advance_threshold(last: &mut f64, utilization: f64, thresholds: &[f64]) -> Option<f64> {
    let crossed = highest_crossed_threshold(utilization, thresholds);
    if crossed > *last {
        *last = crossed;
        Some(crossed)
    } else {
        if crossed < *last {
            *last = crossed;
        }
        None
    }
}

pub fn session_body(utilization: f64, threshold: f64) -> String {
    format!(
        "Session usage at {:.0}% (threshold: {:.0}%)",
        utilization, threshold
    )
}

pub fn weekly_body(utilization: f64, threshold: f64) -> String {
    format!(
        "Weekly usage at {:.0}% (threshold: {:.0}%)",
        utilization, threshold
    )
}
