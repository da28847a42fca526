//! Win32 capabilities.

use super::{PlatformError, PlatformFeatures, WindowHandle};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use windows_sys::Win32::Foundation::{HWND, RECT};
use windows_sys::Win32::System::SystemInformation::GetTickCount;
use windows_sys::Win32::System::Threading::GetCurrentThreadId;
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
    GetLastInputInfo, RegisterHotKey, UnregisterHotKey, LASTINPUTINFO,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    GetMessageW, GetWindowLongW, GetWindowRect, MoveWindow, PostThreadMessageW,
    SetLayeredWindowAttributes, SetWindowLongW, SetWindowPos, GWL_EXSTYLE, HWND_NOTOPMOST,
    HWND_TOPMOST, LWA_ALPHA, MSG, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, WM_HOTKEY, WM_QUIT,
    WS_EX_LAYERED,
};

#[derive(Default)]
pub struct WindowsPlatform {
    /// Thread blocked in `run_hotkey_loop`, 0 when none.
    hotkey_thread: AtomicU32,
    quit_requested: AtomicBool,
}

fn hwnd(window: WindowHandle) -> HWND {
    window.0 as HWND
}

fn last_error(call: &str) -> PlatformError {
    PlatformError::Failed(format!("{} failed: {}", call, std::io::Error::last_os_error()))
}

impl PlatformFeatures for WindowsPlatform {
    fn idle_seconds(&self) -> u64 {
        let mut info = LASTINPUTINFO {
            cbSize: std::mem::size_of::<LASTINPUTINFO>() as u32,
            dwTime: 0,
        };
        // SAFETY: `info` is a properly sized LASTINPUTINFO owned by this frame.
        if unsafe { GetLastInputInfo(&mut info) } == 0 {
            return 0;
        }
        // SAFETY: no preconditions.
        let now = unsafe { GetTickCount() };
        u64::from(now.wrapping_sub(info.dwTime) / 1000)
    }

    fn set_always_on_top(&self, window: WindowHandle, on_top: bool) -> Result<(), PlatformError> {
        let after = if on_top { HWND_TOPMOST } else { HWND_NOTOPMOST };
        // SAFETY: SetWindowPos validates the handle and fails on a stale one.
        let ok = unsafe {
            SetWindowPos(
                hwnd(window),
                after,
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
            )
        };
        if ok == 0 {
            return Err(last_error("SetWindowPos"));
        }
        Ok(())
    }

    fn set_transparency(&self, window: WindowHandle, opacity: f64) -> Result<(), PlatformError> {
        let alpha = (opacity.clamp(0.0, 1.0) * 255.0) as u8;
        // SAFETY: style calls validate the handle; failures surface below.
        let ok = unsafe {
            let style = GetWindowLongW(hwnd(window), GWL_EXSTYLE);
            SetWindowLongW(hwnd(window), GWL_EXSTYLE, style | WS_EX_LAYERED as i32);
            SetLayeredWindowAttributes(hwnd(window), 0, alpha, LWA_ALPHA)
        };
        if ok == 0 {
            return Err(last_error("SetLayeredWindowAttributes"));
        }
        Ok(())
    }

    fn move_window(&self, window: WindowHandle, x: i32, y: i32) -> Result<(), PlatformError> {
        let mut rect = RECT {
            left: 0,
            top: 0,
            right: 0,
            bottom: 0,
        };
        // SAFETY: `rect` is a valid out pointer for the duration of the call.
        if unsafe { GetWindowRect(hwnd(window), &mut rect) } == 0 {
            return Err(last_error("GetWindowRect"));
        }
        let (width, height) = (rect.right - rect.left, rect.bottom - rect.top);
        // SAFETY: MoveWindow validates the handle.
        if unsafe { MoveWindow(hwnd(window), x, y, width, height, 1) } == 0 {
            return Err(last_error("MoveWindow"));
        }
        Ok(())
    }

    fn register_hotkey(&self, id: i32, modifiers: u32, key_code: u32) -> Result<(), PlatformError> {
        // SAFETY: a null window binds the hotkey to the calling thread's queue.
        if unsafe { RegisterHotKey(std::ptr::null_mut(), id, modifiers, key_code) } == 0 {
            return Err(last_error("RegisterHotKey"));
        }
        Ok(())
    }

    fn unregister_hotkey(&self, id: i32) -> Result<(), PlatformError> {
        // SAFETY: see register_hotkey.
        if unsafe { UnregisterHotKey(std::ptr::null_mut(), id) } == 0 {
            return Err(last_error("UnregisterHotKey"));
        }
        Ok(())
    }

    fn run_hotkey_loop(&self, on_hotkey: &dyn Fn(i32)) -> Result<(), PlatformError> {
        // SAFETY: no preconditions.
        self.hotkey_thread
            .store(unsafe { GetCurrentThreadId() }, Ordering::SeqCst);
        // The thread id is published first, so a stop racing with startup
        // either sees it and posts WM_QUIT or is seen here.
        let result = if self.quit_requested.load(Ordering::SeqCst) {
            Ok(())
        } else {
            pump_hotkeys(on_hotkey)
        };
        self.hotkey_thread.store(0, Ordering::SeqCst);
        self.quit_requested.store(false, Ordering::SeqCst);
        result
    }

    fn stop_hotkey_loop(&self) {
        self.quit_requested.store(true, Ordering::SeqCst);
        let thread = self.hotkey_thread.load(Ordering::SeqCst);
        if thread == 0 {
            return;
        }
        // SAFETY: posting to a thread id has no memory-safety preconditions;
        // a thread that already exited makes the call fail harmlessly.
        if unsafe { PostThreadMessageW(thread, WM_QUIT, 0, 0) } == 0 {
            tracing::debug!("{}", last_error("PostThreadMessageW"));
        }
    }
}

fn pump_hotkeys(on_hotkey: &dyn Fn(i32)) -> Result<(), PlatformError> {
    // SAFETY: MSG is plain data; GetMessageW fills it before we read it.
    let mut msg: MSG = unsafe { std::mem::zeroed() };
    loop {
        // SAFETY: `msg` outlives the call; a null window reads the thread queue.
        let ret = unsafe { GetMessageW(&mut msg, std::ptr::null_mut(), 0, 0) };
        match ret {
            0 => return Ok(()),
            -1 => return Err(last_error("GetMessageW")),
            _ if msg.message == WM_HOTKEY => on_hotkey(msg.wParam as i32),
            _ => {}
        }
    }
}
