use super::*;
use crate::api::UsageStat;
use crate::platform::{PlatformError, Rect, WindowHandle};
use chrono::{Duration, TimeZone};
use std::sync::Mutex;

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingPlatform {
    calls: Mutex<Vec<String>>,
}

impl PlatformFeatures for RecordingPlatform {
    fn idle_seconds(&self) -> u64 {
        0
    }

    fn set_always_on_top(&self, w: WindowHandle, on_top: bool) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push(format!("top {} {}", w.0, on_top));
        Ok(())
    }

    fn set_transparency(&self, w: WindowHandle, opacity: f64) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push(format!("alpha {} {}", w.0, opacity));
        Ok(())
    }

    fn move_window(&self, w: WindowHandle, x: i32, y: i32) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push(format!("move {} {} {}", w.0, x, y));
        Ok(())
    }

    fn register_hotkey(&self, _: i32, _: u32, _: u32) -> Result<(), PlatformError> {
        Ok(())
    }

    fn unregister_hotkey(&self, _: i32) -> Result<(), PlatformError> {
        Ok(())
    }
}

struct WindowedOverlay {
    visible: bool,
    events: Arc<Mutex<Vec<String>>>,
}

impl Overlay for WindowedOverlay {
    fn set_status(&mut self, text: &str) {
        self.events.lock().unwrap().push(format!("status {}", text));
    }
    fn update_usage(&mut self, usage: &UsageSnapshot) {
        self.events
            .lock()
            .unwrap()
            .push(format!("usage {}", usage.five_hour.utilization));
    }
    fn show(&mut self) {
        self.visible = true;
        self.events.lock().unwrap().push("show".to_string());
    }
    fn hide(&mut self) {
        self.visible = false;
    }
    fn is_visible(&self) -> bool {
        self.visible
    }
    fn snap_to(&mut self, position: SnapPosition) {
        self.events.lock().unwrap().push(format!("snap {}", position));
    }
    fn window(&self) -> Option<WindowHandle> {
        Some(WindowHandle(42))
    }
    fn snap_origin(&self, position: SnapPosition) -> Option<(i32, i32)> {
        let work_area = Rect {
            x: 0,
            y: 0,
            width: 1920,
            height: 1040,
        };
        position.origin(work_area, 300, 100)
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn snapshot() -> UsageSnapshot {
    UsageSnapshot {
        five_hour: UsageStat {
            utilization: 42.4,
            resets_at: Some(now() + Duration::minutes(130)),
            label: "5-Hour".to_string(),
        },
        seven_day: UsageStat {
            utilization: 17.0,
            resets_at: Some(now() + Duration::hours(76)),
            label: "Weekly".to_string(),
        },
        seven_day_opus: UsageStat::default(),
        seven_day_sonnet: UsageStat::default(),
        fetched_at: now(),
    }
}

#[test]
fn test_usage_summary_respects_visible_stats() {
    let all = VisibleStats::default();
    assert_eq!(
        usage_summary(&snapshot(), &all, now()),
        "Session 42% (resets 2h 10m) | Weekly 17% (resets 3d 4h)"
    );

    let no_resets = VisibleStats {
        reset_time: false,
        weekly_usage: false,
        ..VisibleStats::default()
    };
    assert_eq!(usage_summary(&snapshot(), &no_resets, now()), "Session 42%");
}

#[test]
fn test_tray_labels() {
    let mut usage = snapshot();
    usage.seven_day.resets_at = None;
    assert_eq!(
        tray_labels(&usage, now()),
        [
            "Session: 42% (resets 2h 10m)".to_string(),
            "Weekly: 17% (resets -)".to_string()
        ]
    );
}

#[test]
fn test_terminal_overlay_prints_only_while_visible() {
    let buf = SharedBuf::default();
    let mut overlay = TerminalOverlay::new(buf.clone(), SnapPosition::Top, VisibleStats::default());

    overlay.set_status("Authenticating...");
    assert_eq!(buf.text(), "");

    overlay.show();
    overlay.set_status("Fetching usage...");
    overlay.set_status("Fetching usage...");
    overlay.hide();
    overlay.set_status("Claude API unavailable");

    assert_eq!(
        buf.text(),
        "[claudebar] overlay shown (top)\n[claudebar] Fetching usage...\n"
    );
}

#[test]
fn test_presenter_snap_moves_window_and_shows_hidden_overlay() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let platform = Arc::new(RecordingPlatform::default());
    let overlay = WindowedOverlay {
        visible: false,
        events: Arc::clone(&events),
    };
    let mut presenter = Presenter::new(
        Box::new(overlay),
        Box::new(LogTray::default()),
        Arc::clone(&platform) as Arc<dyn PlatformFeatures>,
        7.0,
    );

    presenter.apply(UiEvent::Snap(SnapPosition::Left));
    presenter.apply(UiEvent::Snap(SnapPosition::Right));
    presenter.apply(UiEvent::Snap(SnapPosition::Floating));

    assert_eq!(
        *events.lock().unwrap(),
        vec!["snap left", "show", "snap right", "snap floating"]
    );
    assert_eq!(
        *platform.calls.lock().unwrap(),
        vec![
            "move 42 0 470",
            "top 42 true",
            "alpha 42 0.85",
            "move 42 1620 470"
        ]
    );
}

#[test]
fn test_log_tray_tracks_overlay_state_and_labels() {
    let mut tray = LogTray::default();
    assert_eq!(tray.toggle_label(), "Show Overlay");
    tray.set_overlay_state(true);
    assert_eq!(tray.toggle_label(), "Hide Overlay");

    assert!(tray.labels().is_none());
    tray.update_usage(&snapshot());
    assert!(tray.labels().unwrap()[0].starts_with("Session: 42%"));
}

#[tokio::test]
async fn test_presenter_drains_channel_in_order() {
    let buf = SharedBuf::default();
    let overlay = TerminalOverlay::new(buf.clone(), SnapPosition::Left, VisibleStats::default());
    let presenter = Presenter::new(
        Box::new(overlay),
        Box::new(LogTray::default()),
        Arc::new(crate::platform::NullPlatform),
        0.85,
    );
    let (ui, rx) = channel();

    ui.send(UiEvent::ShowOverlay);
    ui.set_status("Fetching usage...");
    ui.update_usage(snapshot());
    drop(ui);
    presenter.run(rx).await;

    let text = buf.text();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "[claudebar] overlay shown (left)");
    assert_eq!(lines[1], "[claudebar] Fetching usage...");
    assert!(lines[2].starts_with("[claudebar] Session 42%"));
}
