/*
 * `WindowPlatform` on top of user32 and dwmapi. Every call targets windows by
 * handle only, so the platform itself carries no state and can be created
 * freely on the UI thread.
 */
use super::hwnd_from;
use crate::error::{PlatformError, Result as PlatformResult};
use crate::input::VirtualKey;
use crate::platform::{WindowInfo, WindowPlatform};
use crate::types::{Point, Size, Vector2, WindowHandle, WindowRect};

use windows::Win32::Foundation::{COLORREF, POINT, RECT};
use windows::Win32::Graphics::Dwm::DwmExtendFrameIntoClientArea;
use windows::Win32::Graphics::Gdi::ScreenToClient;
use windows::Win32::UI::Controls::MARGINS;
use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;
use windows::Win32::UI::WindowsAndMessaging::{
    BringWindowToTop, GWL_EXSTYLE, GetCursorPos, GetForegroundWindow, GetWindowInfo,
    GetWindowLongW, HWND_NOTOPMOST, HWND_TOPMOST, LWA_ALPHA, PostQuitMessage, SW_SHOWNOACTIVATE,
    SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER, SetLayeredWindowAttributes,
    SetWindowLongW, SetWindowPos, ShowWindow, WINDOWINFO, WS_EX_LAYERED, WS_EX_TRANSPARENT,
};

/// Margins of -1 turn the whole client area into a DWM "sheet of glass".
const SHEET_OF_GLASS: MARGINS = MARGINS {
    cxLeftWidth: -1,
    cxRightWidth: -1,
    cyTopHeight: -1,
    cyBottomHeight: -1,
};

/// High bit of `GetAsyncKeyState`: the key is down right now.
const KEY_DOWN_MASK: u16 = 0x8000;

#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Platform;

impl Win32Platform {
    pub fn new() -> Self {
        Self
    }
}

pub(crate) fn rect_from(rect: RECT) -> WindowRect {
    WindowRect::new(rect.left, rect.top, rect.right, rect.bottom)
}

impl WindowPlatform for Win32Platform {
    fn window_info(&self, window: WindowHandle) -> PlatformResult<WindowInfo> {
        if window.is_null() {
            return Err(PlatformError::WindowQueryFailed {
                handle: window,
                reason: "null window handle".into(),
            });
        }
        let mut info = WINDOWINFO {
            cbSize: std::mem::size_of::<WINDOWINFO>() as u32,
            ..Default::default()
        };
        unsafe { GetWindowInfo(hwnd_from(window), &mut info) }.map_err(|e| {
            PlatformError::WindowQueryFailed {
                handle: window,
                reason: e.message(),
            }
        })?;
        Ok(WindowInfo {
            window: rect_from(info.rcWindow),
            client: rect_from(info.rcClient),
        })
    }

    fn foreground_window(&self) -> WindowHandle {
        super::handle_from(unsafe { GetForegroundWindow() })
    }

    fn move_window(&mut self, window: WindowHandle, position: Point) -> PlatformResult<()> {
        unsafe {
            SetWindowPos(
                hwnd_from(window),
                None,
                position.x,
                position.y,
                0,
                0,
                SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE,
            )?;
        }
        Ok(())
    }

    fn resize_window(&mut self, window: WindowHandle, size: Size) -> PlatformResult<()> {
        unsafe {
            SetWindowPos(
                hwnd_from(window),
                None,
                0,
                0,
                size.width,
                size.height,
                SWP_NOMOVE | SWP_NOZORDER | SWP_NOACTIVATE,
            )?;
        }
        Ok(())
    }

    /*
     * Positions `target` directly beneath `overlay` in the z-order using the
     * target's own outer rectangle, which keeps the pair stacked together
     * whenever another window is raised in between.
     */
    fn place_above(
        &mut self,
        target: WindowHandle,
        overlay: WindowHandle,
        rect: WindowRect,
    ) -> PlatformResult<()> {
        let size = rect.size();
        unsafe {
            SetWindowPos(
                hwnd_from(target),
                Some(hwnd_from(overlay)),
                rect.left,
                rect.top,
                size.width,
                size.height,
                SWP_NOACTIVATE,
            )?;
        }
        Ok(())
    }

    fn extend_frame_into_client_area(&mut self, window: WindowHandle) -> PlatformResult<()> {
        unsafe { DwmExtendFrameIntoClientArea(hwnd_from(window), &SHEET_OF_GLASS)? };
        Ok(())
    }

    fn cursor_position(&self, window: WindowHandle) -> PlatformResult<Vector2> {
        let mut point = POINT::default();
        unsafe {
            GetCursorPos(&mut point)?;
            if !ScreenToClient(hwnd_from(window), &mut point).as_bool() {
                return Err(PlatformError::OperationFailed(format!(
                    "ScreenToClient failed for {window:?}"
                )));
            }
        }
        Ok(Vector2::new(point.x as f32, point.y as f32))
    }

    fn is_key_down(&self, key: VirtualKey) -> bool {
        let state = unsafe { GetAsyncKeyState(i32::from(key.0)) };
        (state as u16) & KEY_DOWN_MASK != 0
    }

    fn show_no_activate(&mut self, window: WindowHandle) -> PlatformResult<()> {
        // The return value is the previous visibility, not an error.
        let _ = unsafe { ShowWindow(hwnd_from(window), SW_SHOWNOACTIVATE) };
        Ok(())
    }

    fn set_topmost(&mut self, window: WindowHandle, topmost: bool) -> PlatformResult<()> {
        let insert_after = if topmost { HWND_TOPMOST } else { HWND_NOTOPMOST };
        unsafe {
            SetWindowPos(
                hwnd_from(window),
                Some(insert_after),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
            )?;
        }
        Ok(())
    }

    fn bring_to_top(&mut self, window: WindowHandle) -> PlatformResult<()> {
        unsafe { BringWindowToTop(hwnd_from(window))? };
        Ok(())
    }

    fn make_click_through(&mut self, window: WindowHandle) -> PlatformResult<()> {
        let hwnd = hwnd_from(window);
        unsafe {
            let ex_style = GetWindowLongW(hwnd, GWL_EXSTYLE);
            let click_through = ex_style | WS_EX_LAYERED.0 as i32 | WS_EX_TRANSPARENT.0 as i32;
            SetWindowLongW(hwnd, GWL_EXSTYLE, click_through);
            SetLayeredWindowAttributes(hwnd, COLORREF(0), 255, LWA_ALPHA)?;
        }
        log::debug!("Win32Platform: {window:?} is now click-through");
        Ok(())
    }

    fn request_exit(&mut self) {
        log::debug!("Win32Platform: posting WM_QUIT");
        unsafe { PostQuitMessage(0) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_rect_keeps_its_edges() {
        let rect = rect_from(RECT {
            left: 10,
            top: 20,
            right: 110,
            bottom: 220,
        });
        assert_eq!(rect.size(), Size::new(100, 200));
        assert_eq!(rect.position(), Point::new(10, 20));
    }

    #[test]
    fn null_window_cannot_be_queried() {
        let platform = Win32Platform::new();
        assert!(matches!(
            platform.window_info(WindowHandle::NULL),
            Err(PlatformError::WindowQueryFailed { .. })
        ));
    }
}
