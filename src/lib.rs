/*
 * Public entry point of overlayui, a toolkit for transparent click-through
 * overlays that sit on top of another application's window, follow it around
 * and draw a small retained control tree through Direct2D.
 *
 * The lifecycle core (overlay, renderer, updaters, dispatcher, controls) is
 * portable and talks to the window system only through the `WindowPlatform`
 * and `GraphicsBackend` traits, so it compiles and is tested on every host.
 * The native bindings live in `win32` and only exist on Windows.
 */
pub mod config;
pub mod controls;
pub mod dispatcher;
pub mod error;
pub mod input;
pub mod layout;
pub mod overlay;
pub mod platform;
pub mod renderer;
pub mod types;
pub mod updater;
#[cfg(target_os = "windows")]
pub mod win32;

#[cfg(test)]
mod testing;

pub use config::{OverlayConfig, Settings};
pub use controls::{Button, Control, ControlBase, KeyButton, Label, Panel, Spacer, Window};
pub use dispatcher::{DispatchSender, Dispatcher, NoopWaker, UiMessage, UiWaker};
pub use error::{PlatformError, Result as PlatformResult};
pub use input::{InputSnapshot, MouseButton, VirtualKey};
pub use layout::Layout;
pub use overlay::{Overlay, TickEvent};
pub use platform::{WindowInfo, WindowPlatform};
pub use renderer::{GraphicsBackend, RenderSurface, Renderer};
pub use types::{Color, Margins, Point, Size, Vector2, WindowGeometry, WindowHandle, WindowRect};
pub use updater::{TickFlow, Updater};

#[cfg(target_os = "windows")]
pub use win32::app::{ExitHandle, OverlayApp};
