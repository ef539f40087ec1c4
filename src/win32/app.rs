/*
 * Ready-to-run overlay host. `OverlayApp` creates the overlay window on the
 * calling thread, binds a Direct2D backend to it and runs the message loop
 * that executes the updater ticks. It must stay on the thread that created
 * it, which the `Rc` inside the exit handle enforces.
 */
use super::direct2d::Direct2DBackend;
use super::platform::Win32Platform;
use super::window::{self, Win32Waker};
use crate::config::OverlayConfig;
use crate::error::{PlatformError, Result as PlatformResult};
use crate::overlay::Overlay;
use crate::types::WindowHandle;

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

pub type Win32Overlay = Overlay<Win32Platform, Direct2DBackend>;

/// Lets tick or draw subscribers end the application from inside the loop.
#[derive(Debug, Clone, Default)]
pub struct ExitHandle(Rc<Cell<bool>>);

impl ExitHandle {
    pub fn request(&self) {
        self.0.set(true);
    }

    pub fn is_requested(&self) -> bool {
        self.0.get()
    }
}

pub struct OverlayApp {
    overlay: Win32Overlay,
    window: WindowHandle,
    exit: ExitHandle,
}

impl OverlayApp {
    pub fn new(title: &str, config: OverlayConfig) -> PlatformResult<Self> {
        config.validate()?;
        let window = window::create_overlay_window(title)?;
        let waker = Arc::new(Win32Waker::new(window));
        let mut overlay = Overlay::new(
            Win32Platform::new(),
            Direct2DBackend::new(),
            window,
            config,
            waker,
        );
        if let Err(e) = overlay.prepare_window() {
            log::error!("OverlayApp: could not prepare the overlay window: {e}");
            window::destroy_overlay_window(window);
            return Err(e);
        }
        log::info!("OverlayApp: '{title}' ready");
        Ok(Self {
            overlay,
            window,
            exit: ExitHandle::default(),
        })
    }

    pub fn overlay(&self) -> &Win32Overlay {
        &self.overlay
    }

    /// For adding controls and event subscribers before `run`.
    pub fn overlay_mut(&mut self) -> &mut Win32Overlay {
        &mut self.overlay
    }

    pub fn exit_handle(&self) -> ExitHandle {
        self.exit.clone()
    }

    /*
     * Attaches to `target`, shows the overlay and blocks in the message loop.
     * An exit request kills the overlay, which posts `WM_QUIT` and ends the
     * loop.
     */
    pub fn run(&mut self, target: WindowHandle) -> PlatformResult<()> {
        self.overlay.attach(target)?;
        self.overlay.show_inactive_topmost()?;

        let exit = self.exit.clone();
        let result = window::run_message_loop(&mut self.overlay, |overlay| {
            if exit.is_requested() && !overlay.is_killed() {
                overlay.kill();
            }
        });
        // Covers WM_QUIT from elsewhere; a no-op after an exit request.
        self.overlay.kill();
        result
    }

    /// Like `run`, for a target known only by its window title.
    pub fn run_for_title(&mut self, target_title: &str) -> PlatformResult<()> {
        let target = window::find_window_by_title(target_title).ok_or_else(|| {
            PlatformError::InvalidHandle(format!(
                "no top-level window titled '{target_title}'"
            ))
        })?;
        self.run(target)
    }
}

impl Drop for OverlayApp {
    fn drop(&mut self) {
        self.overlay.detach();
        window::destroy_overlay_window(self.window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_handle_is_shared_between_clones() {
        let handle = ExitHandle::default();
        let subscriber = handle.clone();
        assert!(!handle.is_requested());
        subscriber.request();
        assert!(handle.is_requested());
    }
}
