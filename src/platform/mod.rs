//! OS capabilities consumed by the app: idle detection, overlay window
//! control and global hotkeys.
//!
//! Every capability may be missing. Callers treat errors as "not available"
//! and carry on; idle detection reports 0 (user active) when it cannot tell.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
    #[error("{0}")]
    Failed(String),
}

/// Native window identifier (HWND on Windows, X11 window id on Linux).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHandle(pub isize);

pub trait PlatformFeatures: Send + Sync {
    /// Seconds since the last keyboard or mouse input.
    fn idle_seconds(&self) -> u64;
    fn set_always_on_top(&self, window: WindowHandle, on_top: bool) -> Result<(), PlatformError>;
    /// `opacity` is in `0.0..=1.0`.
    fn set_transparency(&self, window: WindowHandle, opacity: f64) -> Result<(), PlatformError>;
    fn move_window(&self, window: WindowHandle, x: i32, y: i32) -> Result<(), PlatformError>;
    fn register_hotkey(&self, id: i32, modifiers: u32, key_code: u32) -> Result<(), PlatformError>;
    fn unregister_hotkey(&self, id: i32) -> Result<(), PlatformError>;

    /// Blocks the calling thread delivering hotkey ids registered on it.
    fn run_hotkey_loop(&self, _on_hotkey: &dyn Fn(i32)) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("global hotkeys"))
    }

    /// Makes a running (or about to run) `run_hotkey_loop` return.
    fn stop_hotkey_loop(&self) {}
}

/// Platform with no capabilities; the user always appears active.
#[derive(Debug, Default)]
pub struct NullPlatform;

impl PlatformFeatures for NullPlatform {
    fn idle_seconds(&self) -> u64 {
        0
    }

    fn set_always_on_top(&self, _: WindowHandle, _: bool) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("always-on-top"))
    }

    fn set_transparency(&self, _: WindowHandle, _: f64) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("transparency"))
    }

    fn move_window(&self, _: WindowHandle, _: i32, _: i32) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("window positioning"))
    }

    fn register_hotkey(&self, _: i32, _: u32, _: u32) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("global hotkeys"))
    }

    fn unregister_hotkey(&self, _: i32) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("global hotkeys"))
    }
}

/// Capabilities for the OS this binary was built for.
#[cfg(target_os = "linux")]
pub fn detect() -> Arc<dyn PlatformFeatures> {
    Arc::new(linux::LinuxPlatform)
}

#[cfg(target_os = "macos")]
pub fn detect() -> Arc<dyn PlatformFeatures> {
    Arc::new(macos::MacPlatform)
}

#[cfg(target_os = "windows")]
pub fn detect() -> Arc<dyn PlatformFeatures> {
    Arc::new(windows::WindowsPlatform::default())
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub fn detect() -> Arc<dyn PlatformFeatures> {
    Arc::new(NullPlatform)
}

/// Where the overlay sits on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapPosition {
    Floating,
    Left,
    Right,
    Top,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl SnapPosition {
    pub const ALL: [SnapPosition; 8] = [
        Self::Floating,
        Self::Left,
        Self::Right,
        Self::Top,
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Floating => "floating",
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
        }
    }
}

/// Screen area in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl SnapPosition {
    /// Top-left corner for a `width` x `height` window snapped inside
    /// `work_area`. Edges center the window along that edge; `Floating` has
    /// no fixed corner.
    pub fn origin(self, work_area: Rect, width: i32, height: i32) -> Option<(i32, i32)> {
        let left = work_area.x;
        let right = work_area.x + work_area.width - width;
        let center_x = work_area.x + (work_area.width - width) / 2;
        let top = work_area.y;
        let bottom = work_area.y + work_area.height - height;
        let center_y = work_area.y + (work_area.height - height) / 2;

        match self {
            Self::Floating => None,
            Self::Left => Some((left, center_y)),
            Self::Right => Some((right, center_y)),
            Self::Top => Some((center_x, top)),
            Self::TopLeft => Some((left, top)),
            Self::TopRight => Some((right, top)),
            Self::BottomLeft => Some((left, bottom)),
            Self::BottomRight => Some((right, bottom)),
        }
    }
}

impl fmt::Display for SnapPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnapPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown snap position: {}", s))
    }
}

pub const MOD_ALT: u32 = 0x0001;
pub const MOD_CTRL: u32 = 0x0002;
pub const MOD_SHIFT: u32 = 0x0004;

pub const VK_LEFT: u32 = 0x25;
pub const VK_UP: u32 = 0x26;
pub const VK_RIGHT: u32 = 0x27;
pub const VK_DOWN: u32 = 0x28;
pub const VK_OEM_PERIOD: u32 = 0xBE;

pub const HOTKEY_SNAP_LEFT: i32 = 1;
pub const HOTKEY_SNAP_RIGHT: i32 = 2;
pub const HOTKEY_SNAP_TOP: i32 = 3;
pub const HOTKEY_SNAP_TOP_LEFT: i32 = 4;
pub const HOTKEY_SNAP_TOP_RIGHT: i32 = 5;
pub const HOTKEY_SNAP_BOTTOM_LEFT: i32 = 6;
pub const HOTKEY_SNAP_BOTTOM_RIGHT: i32 = 7;
pub const HOTKEY_TOGGLE_OVERLAY: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub id: i32,
    pub modifiers: u32,
    pub key_code: u32,
    pub description: &'static str,
}

/// Ctrl+Alt(+Shift)+arrows snap the overlay; Ctrl+Alt+. toggles settings.
pub fn default_bindings() -> [HotkeyBinding; 8] {
    let ca = MOD_CTRL | MOD_ALT;
    let cas = ca | MOD_SHIFT;
    let bind = |id, modifiers, key_code, description| HotkeyBinding {
        id,
        modifiers,
        key_code,
        description,
    };
    [
        bind(HOTKEY_SNAP_LEFT, ca, VK_LEFT, "Ctrl+Alt+Left -> Snap left"),
        bind(HOTKEY_SNAP_RIGHT, ca, VK_RIGHT, "Ctrl+Alt+Right -> Snap right"),
        bind(HOTKEY_SNAP_TOP, ca, VK_UP, "Ctrl+Alt+Up -> Snap top"),
        bind(HOTKEY_SNAP_BOTTOM_RIGHT, ca, VK_DOWN, "Ctrl+Alt+Down -> Snap bottom-right"),
        bind(HOTKEY_SNAP_TOP_LEFT, cas, VK_LEFT, "Ctrl+Alt+Shift+Left -> Snap top-left"),
        bind(HOTKEY_SNAP_TOP_RIGHT, cas, VK_RIGHT, "Ctrl+Alt+Shift+Right -> Snap top-right"),
        bind(HOTKEY_SNAP_BOTTOM_LEFT, cas, VK_DOWN, "Ctrl+Alt+Shift+Down -> Snap bottom-left"),
        bind(HOTKEY_TOGGLE_OVERLAY, ca, VK_OEM_PERIOD, "Ctrl+Alt+. -> Toggle overlay"),
    ]
}

/// Runs an external tool and returns its trimmed stdout.
#[cfg(any(target_os = "linux", target_os = "macos"))]
fn command_output(program: &str, args: &[&str]) -> Result<String, PlatformError> {
    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .map_err(|e| PlatformError::Failed(format!("{} unavailable: {}", program, e)))?;
    if !output.status.success() {
        return Err(PlatformError::Failed(format!(
            "{} exited with {}",
            program, output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_position_strings_roundtrip() {
        for position in SnapPosition::ALL {
            assert_eq!(position.as_str().parse::<SnapPosition>(), Ok(position));
        }
        assert_eq!(SnapPosition::TopLeft.to_string(), "top-left");
        assert!("middle".parse::<SnapPosition>().is_err());
    }

    #[test]
    fn test_snap_origin_inside_work_area() {
        let work_area = Rect {
            x: 0,
            y: 40,
            width: 1920,
            height: 1000,
        };
        let origins: Vec<_> = SnapPosition::ALL
            .iter()
            .map(|p| p.origin(work_area, 320, 100))
            .collect();
        assert_eq!(
            origins,
            vec![
                None,
                Some((0, 490)),
                Some((1600, 490)),
                Some((800, 40)),
                Some((0, 40)),
                Some((1600, 40)),
                Some((0, 940)),
                Some((1600, 940)),
            ]
        );
    }

    #[test]
    fn test_default_bindings_cover_every_hotkey_once() {
        let mut ids: Vec<i32> = default_bindings().iter().map(|b| b.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn test_null_platform_degrades() {
        let platform = NullPlatform;
        let window = WindowHandle(1);
        assert_eq!(platform.idle_seconds(), 0);
        assert!(matches!(
            platform.set_always_on_top(window, true),
            Err(PlatformError::Unsupported(_))
        ));
        assert!(platform.set_transparency(window, 0.5).is_err());
        assert!(platform.move_window(window, 0, 0).is_err());
        assert!(platform.register_hotkey(1, MOD_CTRL, VK_LEFT).is_err());
        assert!(platform.unregister_hotkey(1).is_err());
        assert!(platform.run_hotkey_loop(&|_| {}).is_err());
    }
}
