/*
 * Native Windows bindings of the overlay: the `WindowPlatform` on top of
 * user32/dwmapi, the Direct2D `GraphicsBackend`, the overlay window with its
 * message loop, and `OverlayApp` which wires them together.
 */
pub mod app;
pub mod direct2d;
pub mod platform;
pub mod window;

use crate::types::WindowHandle;

use std::ffi::c_void;
use windows::Win32::Foundation::HWND;

#[inline]
pub(crate) fn hwnd_from(handle: WindowHandle) -> HWND {
    HWND(handle.0 as *mut c_void)
}

#[inline]
pub(crate) fn handle_from(hwnd: HWND) -> WindowHandle {
    WindowHandle(hwnd.0 as isize)
}
