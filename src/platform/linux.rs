//! X11 capabilities through the usual command-line tools
//! (`xprintidle`, `wmctrl`, `xprop`, `xdotool`).

use super::{command_output, PlatformError, PlatformFeatures, WindowHandle};

pub struct LinuxPlatform;

impl PlatformFeatures for LinuxPlatform {
    fn idle_seconds(&self) -> u64 {
        match command_output("xprintidle", &[]) {
            Ok(out) => parse_xprintidle(&out),
            Err(_) => 0,
        }
    }

    fn set_always_on_top(&self, window: WindowHandle, on_top: bool) -> Result<(), PlatformError> {
        let action = if on_top { "add,above" } else { "remove,above" };
        let id = format!("0x{:x}", window.0);
        command_output("wmctrl", &["-i", "-r", &id, "-b", action])
            .map(|_| ())
            .map_err(|e| {
                tracing::debug!("wmctrl failed: {}", e);
                PlatformError::Unsupported("always-on-top (install wmctrl)")
            })
    }

    fn set_transparency(&self, window: WindowHandle, opacity: f64) -> Result<(), PlatformError> {
        let alpha = (opacity.clamp(0.0, 1.0) * f64::from(u32::MAX)) as u32;
        let id = format!("0x{:x}", window.0);
        let alpha = alpha.to_string();
        command_output(
            "xprop",
            &[
                "-id",
                &id,
                "-f",
                "_NET_WM_WINDOW_OPACITY",
                "32c",
                "-set",
                "_NET_WM_WINDOW_OPACITY",
                &alpha,
            ],
        )
        .map(|_| ())
        .map_err(|e| {
            tracing::debug!("xprop failed: {}", e);
            PlatformError::Unsupported("transparency (install xprop)")
        })
    }

    fn move_window(&self, window: WindowHandle, x: i32, y: i32) -> Result<(), PlatformError> {
        let (id, x, y) = (window.0.to_string(), x.to_string(), y.to_string());
        command_output("xdotool", &["windowmove", &id, &x, &y]).map(|_| ())
    }

    fn register_hotkey(&self, id: i32, _: u32, _: u32) -> Result<(), PlatformError> {
        tracing::debug!("Global hotkey {} needs an X11 key grab; skipping", id);
        Err(PlatformError::Unsupported("global hotkeys"))
    }

    fn unregister_hotkey(&self, _: i32) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("global hotkeys"))
    }
}

/// `xprintidle` prints milliseconds; unparseable output counts as active.
fn parse_xprintidle(out: &str) -> u64 {
    out.trim().parse::<u64>().map(|ms| ms / 1000).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_xprintidle() {
        assert_eq!(parse_xprintidle("305123\n"), 305);
        assert_eq!(parse_xprintidle("999"), 0);
        assert_eq!(parse_xprintidle("garbage"), 0);
        assert_eq!(parse_xprintidle(""), 0);
    }
}
