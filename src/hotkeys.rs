//! Global hotkey dispatch: snap the overlay or toggle settings.

use crate::platform::{
    default_bindings, PlatformFeatures, SnapPosition, HOTKEY_SNAP_BOTTOM_LEFT,
    HOTKEY_SNAP_BOTTOM_RIGHT, HOTKEY_SNAP_LEFT, HOTKEY_SNAP_RIGHT, HOTKEY_SNAP_TOP,
    HOTKEY_SNAP_TOP_LEFT, HOTKEY_SNAP_TOP_RIGHT, HOTKEY_TOGGLE_OVERLAY,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub type SnapCallback = Arc<dyn Fn(SnapPosition) + Send + Sync>;
pub type ToggleCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    snap: Option<SnapCallback>,
    toggle: Option<ToggleCallback>,
}

pub struct HotkeyManager {
    platform: Arc<dyn PlatformFeatures>,
    callbacks: Mutex<Callbacks>,
    running: AtomicBool,
}

impl HotkeyManager {
    pub fn new(platform: Arc<dyn PlatformFeatures>) -> Self {
        Self {
            platform,
            callbacks: Mutex::new(Callbacks::default()),
            running: AtomicBool::new(false),
        }
    }

    pub fn set_snap_callback(&self, callback: SnapCallback) {
        self.lock().snap = Some(callback);
    }

    pub fn set_toggle_callback(&self, callback: ToggleCallback) {
        self.lock().toggle = Some(callback);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Callbacks> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Registers the default bindings on a dedicated listener thread.
    ///
    /// Registration and delivery share that thread because Win32 binds
    /// hotkeys to the registering thread's message queue.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let manager = Arc::clone(self);
        let spawned = std::thread::Builder::new()
            .name("hotkeys".to_string())
            .spawn(move || manager.listen());
        if let Err(e) = spawned {
            tracing::warn!("Failed to start hotkey listener: {}", e);
            self.running.store(false, Ordering::SeqCst);
        }
    }

    fn listen(&self) {
        let mut registered = 0;
        for binding in default_bindings() {
            match self
                .platform
                .register_hotkey(binding.id, binding.modifiers, binding.key_code)
            {
                Ok(()) => {
                    registered += 1;
                    tracing::info!("  {}", binding.description);
                }
                Err(e) => tracing::debug!("Hotkey {} not registered: {}", binding.id, e),
            }
        }
        if registered == 0 {
            tracing::info!("Global hotkeys unavailable on this platform");
            self.running.store(false, Ordering::SeqCst);
            return;
        }

        let deliver = |id| {
            if self.is_running() {
                self.handle(id);
            }
        };
        if let Err(e) = self.platform.run_hotkey_loop(&deliver) {
            tracing::warn!("Hotkey listener stopped: {}", e);
        }
        for binding in default_bindings() {
            let _ = self.platform.unregister_hotkey(binding.id);
        }
        self.running.store(false, Ordering::SeqCst);
    }

    /// Stops dispatching and wakes the listener so it unregisters the
    /// bindings. Events still queued on the listener are dropped.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.platform.stop_hotkey_loop();
            tracing::info!("Hotkey listener stopped");
        }
    }

    /// Dispatches one hotkey id. Unknown ids are logged and ignored.
    pub fn handle(&self, id: i32) {
        let (snap, toggle) = {
            let callbacks = self.lock();
            (callbacks.snap.clone(), callbacks.toggle.clone())
        };

        if id == HOTKEY_TOGGLE_OVERLAY {
            tracing::debug!("Hotkey: toggle overlay");
            if let Some(toggle) = toggle {
                toggle();
            }
            return;
        }

        let Some(position) = snap_position_for(id) else {
            tracing::debug!("Unknown hotkey id: {}", id);
            return;
        };
        tracing::debug!("Hotkey: snap {}", position);
        if let Some(snap) = snap {
            snap(position);
        }
    }
}

pub fn snap_position_for(id: i32) -> Option<SnapPosition> {
    match id {
        HOTKEY_SNAP_LEFT => Some(SnapPosition::Left),
        HOTKEY_SNAP_RIGHT => Some(SnapPosition::Right),
        HOTKEY_SNAP_TOP => Some(SnapPosition::Top),
        HOTKEY_SNAP_TOP_LEFT => Some(SnapPosition::TopLeft),
        HOTKEY_SNAP_TOP_RIGHT => Some(SnapPosition::TopRight),
        HOTKEY_SNAP_BOTTOM_LEFT => Some(SnapPosition::BottomLeft),
        HOTKEY_SNAP_BOTTOM_RIGHT => Some(SnapPosition::BottomRight),
        _ => None,
    }
}
