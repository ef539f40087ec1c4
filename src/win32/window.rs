/*
 * The overlay's own native window and the UI thread's message loop. The
 * window is a borderless layered popup that never activates and lets every
 * mouse message fall through to whatever is underneath. Updater ticks reach
 * the loop as `WM_APP_OVERLAY_DISPATCH` posted by `Win32Waker`.
 */
use super::{handle_from, hwnd_from};
use crate::dispatcher::UiWaker;
use crate::error::{PlatformError, Result as PlatformResult};
use crate::overlay::Overlay;
use crate::platform::WindowPlatform;
use crate::renderer::GraphicsBackend;
use crate::types::WindowHandle;

use std::ffi::c_void;
use windows::Win32::Foundation::{GetLastError, HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CS_HREDRAW, CS_VREDRAW, CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW,
    FindWindowW, GetClassInfoExW, GetMessageW, HTTRANSPARENT, IDC_ARROW, LoadCursorW, MSG,
    PostMessageW, PostQuitMessage, RegisterClassExW, TranslateMessage, WINDOW_STYLE, WM_APP,
    WM_DESTROY, WM_ERASEBKGND, WM_NCHITTEST, WNDCLASSEXW, WS_EX_LAYERED, WS_EX_NOACTIVATE,
    WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
};
use windows::core::{HSTRING, PCWSTR, w};

/// Posted by `Win32Waker` whenever an updater queued a tick.
pub const WM_APP_OVERLAY_DISPATCH: u32 = WM_APP + 1;

const OVERLAY_CLASS_NAME: PCWSTR = w!("OverlayUi_OverlayWindowClass");

fn module_instance() -> PlatformResult<HINSTANCE> {
    let module = unsafe { GetModuleHandleW(None) }.map_err(|e| {
        PlatformError::InitializationFailed(format!("GetModuleHandleW failed: {e}"))
    })?;
    Ok(module.into())
}

/// Registers the overlay window class once per process.
pub fn register_overlay_class() -> PlatformResult<()> {
    let instance = module_instance()?;
    unsafe {
        let mut existing = WNDCLASSEXW::default();
        if GetClassInfoExW(Some(instance), OVERLAY_CLASS_NAME, &mut existing).is_ok() {
            log::debug!("Overlay window class already registered");
            return Ok(());
        }

        let wc = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(overlay_wnd_proc),
            hInstance: instance,
            hCursor: LoadCursorW(None, IDC_ARROW)?,
            lpszClassName: OVERLAY_CLASS_NAME,
            ..Default::default()
        };

        if RegisterClassExW(&wc) == 0 {
            let error = GetLastError();
            log::error!("RegisterClassExW for the overlay failed: {error:?}");
            return Err(PlatformError::InitializationFailed(format!(
                "RegisterClassExW failed: {error:?}"
            )));
        }
    }
    log::debug!("Overlay window class registered");
    Ok(())
}

/*
 * Creates the hidden overlay window. It becomes visible once the caller makes
 * it click-through (which sets its layered alpha) and shows it without
 * activation.
 */
pub fn create_overlay_window(title: &str) -> PlatformResult<WindowHandle> {
    register_overlay_class()?;
    let instance = module_instance()?;
    let hwnd = unsafe {
        CreateWindowExW(
            WS_EX_LAYERED | WS_EX_TRANSPARENT | WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE,
            OVERLAY_CLASS_NAME,
            &HSTRING::from(title),
            WINDOW_STYLE(WS_POPUP.0),
            0,
            0,
            1,
            1,
            None,
            None,
            Some(instance),
            None,
        )?
    };
    log::debug!("Created overlay window {hwnd:?} '{title}'");
    Ok(handle_from(hwnd))
}

pub fn destroy_overlay_window(window: WindowHandle) {
    if let Err(e) = unsafe { DestroyWindow(hwnd_from(window)) } {
        log::warn!("DestroyWindow for the overlay failed: {e}");
    }
}

/// Looks up a top-level window by its exact title.
pub fn find_window_by_title(title: &str) -> Option<WindowHandle> {
    let hwnd = unsafe { FindWindowW(PCWSTR::null(), &HSTRING::from(title)) }.ok()?;
    if hwnd.is_invalid() {
        return None;
    }
    Some(handle_from(hwnd))
}

unsafe extern "system" fn overlay_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_NCHITTEST => LRESULT(HTTRANSPARENT as isize),
        // Direct2D repaints the whole client area every frame.
        WM_ERASEBKGND => LRESULT(1),
        WM_DESTROY => {
            unsafe { PostQuitMessage(0) };
            LRESULT(0)
        }
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}

/*
 * Wakes the message loop by posting to the overlay window. Holds the raw
 * handle value because `HWND` itself is not `Send`.
 */
#[derive(Debug, Clone, Copy)]
pub struct Win32Waker {
    hwnd: isize,
}

impl Win32Waker {
    pub fn new(window: WindowHandle) -> Self {
        Self { hwnd: window.0 }
    }
}

impl UiWaker for Win32Waker {
    fn wake(&self) {
        let hwnd = HWND(self.hwnd as *mut c_void);
        if let Err(e) =
            unsafe { PostMessageW(Some(hwnd), WM_APP_OVERLAY_DISPATCH, WPARAM(0), LPARAM(0)) }
        {
            log::trace!("Win32Waker: PostMessageW failed: {e}");
        }
    }
}

/*
 * Runs the UI thread's message loop until `WM_QUIT`. Dispatch wake-ups for
 * the overlay window are handled here instead of in the window procedure so
 * the overlay can be borrowed mutably; `after_pump` runs after each batch.
 */
pub fn run_message_loop<P, B>(
    overlay: &mut Overlay<P, B>,
    mut after_pump: impl FnMut(&mut Overlay<P, B>),
) -> PlatformResult<()>
where
    P: WindowPlatform,
    B: GraphicsBackend,
{
    let overlay_hwnd = hwnd_from(overlay.handle());
    let mut msg = MSG::default();
    loop {
        let status = unsafe { GetMessageW(&mut msg, None, 0, 0) };
        match status.0 {
            -1 => {
                let error = unsafe { GetLastError() };
                log::error!("GetMessageW failed: {error:?}");
                return Err(PlatformError::OperationFailed(format!(
                    "GetMessageW failed: {error:?}"
                )));
            }
            0 => {
                log::debug!("Message loop: WM_QUIT received");
                return Ok(());
            }
            _ => {}
        }

        if msg.message == WM_APP_OVERLAY_DISPATCH && msg.hwnd == overlay_hwnd {
            overlay.pump();
            after_pump(overlay);
            continue;
        }
        unsafe {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}
