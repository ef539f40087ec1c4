/*
 * Window-system seam of the overlay. The overlay core only talks to native
 * windows through `WindowPlatform`, which keeps the lifecycle logic testable
 * without a desktop session. `win32::platform::Win32Platform` is the real
 * implementation.
 */
use crate::error::Result as PlatformResult;
use crate::input::VirtualKey;
use crate::types::{Point, Size, Vector2, WindowHandle, WindowRect};

/// Screen-space rectangles of a window, as reported by the window system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowInfo {
    /// Outer rectangle including the non-client frame.
    pub window: WindowRect,
    /// Client area in screen coordinates.
    pub client: WindowRect,
}

pub trait WindowPlatform {
    /// Fails with `PlatformError::WindowQueryFailed` when the window cannot be queried.
    fn window_info(&self, window: WindowHandle) -> PlatformResult<WindowInfo>;
    fn foreground_window(&self) -> WindowHandle;

    fn move_window(&mut self, window: WindowHandle, position: Point) -> PlatformResult<()>;
    fn resize_window(&mut self, window: WindowHandle, size: Size) -> PlatformResult<()>;
    /*
     * Re-asserts the overlay's placement directly above `target` in the
     * z-order, covering `rect`. Called on every logic tick.
     */
    fn place_above(
        &mut self,
        target: WindowHandle,
        overlay: WindowHandle,
        rect: WindowRect,
    ) -> PlatformResult<()>;
    /// Composites the whole client area with per-pixel alpha.
    fn extend_frame_into_client_area(&mut self, window: WindowHandle) -> PlatformResult<()>;

    /// Cursor position in `window`'s client coordinates.
    fn cursor_position(&self, window: WindowHandle) -> PlatformResult<Vector2>;
    /// Live state of a key or mouse button, independent of window focus.
    fn is_key_down(&self, key: VirtualKey) -> bool;

    fn show_no_activate(&mut self, window: WindowHandle) -> PlatformResult<()>;
    fn set_topmost(&mut self, window: WindowHandle, topmost: bool) -> PlatformResult<()>;
    fn bring_to_top(&mut self, window: WindowHandle) -> PlatformResult<()>;
    /// Adds the layered and transparent extended styles so input falls through.
    fn make_click_through(&mut self, window: WindowHandle) -> PlatformResult<()>;

    /// Asks the hosting application to terminate its message loop.
    fn request_exit(&mut self);
}
