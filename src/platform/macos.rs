//! macOS capabilities. Window level and opacity need AppKit access, so only
//! idle time and AppleScript positioning are available.

use super::{command_output, PlatformError, PlatformFeatures, WindowHandle};

pub struct MacPlatform;

impl PlatformFeatures for MacPlatform {
    fn idle_seconds(&self) -> u64 {
        command_output("ioreg", &["-c", "IOHIDSystem", "-d", "4"])
            .ok()
            .and_then(|out| parse_hid_idle_time(&out))
            .unwrap_or(0)
    }

    fn set_always_on_top(&self, _: WindowHandle, _: bool) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("always-on-top"))
    }

    fn set_transparency(&self, _: WindowHandle, _: f64) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("transparency"))
    }

    fn move_window(&self, _: WindowHandle, x: i32, y: i32) -> Result<(), PlatformError> {
        let script = format!(
            "tell application \"System Events\" to tell (first process whose frontmost is true) \
             to set position of window 1 to {{{}, {}}}",
            x, y
        );
        command_output("osascript", &["-e", &script]).map(|_| ())
    }

    fn register_hotkey(&self, id: i32, _: u32, _: u32) -> Result<(), PlatformError> {
        tracing::debug!("Global hotkey {} needs the Carbon hotkey API; skipping", id);
        Err(PlatformError::Unsupported("global hotkeys"))
    }

    fn unregister_hotkey(&self, _: i32) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("global hotkeys"))
    }
}

/// Extracts `"HIDIdleTime" = <ns>` from `ioreg` output as whole seconds.
fn parse_hid_idle_time(out: &str) -> Option<u64> {
    out.lines()
        .filter(|line| line.contains("HIDIdleTime"))
        .find_map(|line| line.split_once('=')?.1.trim().parse::<u64>().ok())
        .map(|ns| ns / 1_000_000_000)
}
