/*
 * Test doubles for the platform seams. `RecordingBackend` and
 * `RecordingSurface` log every call so tests can assert on draw order,
 * `FakePlatform` serves scripted window rectangles and records placement
 * requests.
 */
use crate::error::{PlatformError, Result as PlatformResult};
use crate::input::VirtualKey;
use crate::platform::{WindowInfo, WindowPlatform};
use crate::renderer::{Ellipse, GraphicsBackend, RenderSurface, RenderTarget};
use crate::types::{Color, FontDescription, Point, Size, Vector2, WindowHandle, WindowRect};

use std::collections::{HashMap, HashSet};

const GLYPH_WIDTH: f32 = 6.0;
const SURFACE_LINE_HEIGHT: f32 = 12.0;

fn text_width(text: &str) -> f32 {
    text.chars().count() as f32 * GLYPH_WIDTH
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Startup,
    Shutdown,
    CreateDevice(RenderTarget),
    ReleaseDevice(u64),
    Resize(Size),
    CreateFont(String),
    ReleaseFont(String),
    BeginDraw,
    EndDraw,
    Clear(Color),
    DrawLine { from: Vector2, to: Vector2 },
    DrawRectangle { position: Vector2, size: Vector2 },
    FillRectangle { position: Vector2, size: Vector2 },
    DrawEllipse(Ellipse),
    FillEllipse(Ellipse),
    FillPolygon(Vec<Vector2>),
    DrawText {
        text: String,
        position: Vector2,
        size: Vector2,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordingDevice {
    pub id: u64,
    pub target: RenderTarget,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<BackendCall>,
    pub lose_device_on_next_end_draw: bool,
    pub fail_next_end_draw: bool,
    pub fail_create_device: bool,
    pub fail_next_resize: bool,
    devices_created: u64,
}

impl RecordingBackend {
    pub fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }
}

impl GraphicsBackend for RecordingBackend {
    type Device = RecordingDevice;
    type Font = FontDescription;

    fn startup(&mut self) -> PlatformResult<()> {
        self.calls.push(BackendCall::Startup);
        Ok(())
    }

    fn shutdown(&mut self) {
        self.calls.push(BackendCall::Shutdown);
    }

    fn create_device(&mut self, target: &RenderTarget) -> PlatformResult<RecordingDevice> {
        if self.fail_create_device {
            return Err(PlatformError::InitializationFailed(
                "recording backend refused to create a device".into(),
            ));
        }
        self.calls.push(BackendCall::CreateDevice(*target));
        self.devices_created += 1;
        Ok(RecordingDevice {
            id: self.devices_created,
            target: *target,
        })
    }

    fn release_device(&mut self, device: RecordingDevice) {
        self.calls.push(BackendCall::ReleaseDevice(device.id));
    }

    fn resize(&mut self, device: &mut RecordingDevice, size: Size) -> PlatformResult<()> {
        if std::mem::take(&mut self.fail_next_resize) {
            return Err(PlatformError::OperationFailed("simulated resize failure".into()));
        }
        device.target.pixel_size = size;
        self.calls.push(BackendCall::Resize(size));
        Ok(())
    }

    fn create_font(&mut self, description: &FontDescription) -> PlatformResult<FontDescription> {
        self.calls
            .push(BackendCall::CreateFont(description.family.clone()));
        Ok(description.clone())
    }

    fn release_font(&mut self, font: FontDescription) {
        self.calls.push(BackendCall::ReleaseFont(font.family));
    }

    fn begin_draw(&mut self, _device: &mut RecordingDevice) {
        self.calls.push(BackendCall::BeginDraw);
    }

    fn end_draw(&mut self, _device: &mut RecordingDevice) -> PlatformResult<()> {
        self.calls.push(BackendCall::EndDraw);
        if std::mem::take(&mut self.lose_device_on_next_end_draw) {
            return Err(PlatformError::DeviceLost("simulated device loss".into()));
        }
        if std::mem::take(&mut self.fail_next_end_draw) {
            return Err(PlatformError::OperationFailed("simulated end_draw failure".into()));
        }
        Ok(())
    }

    fn clear(&mut self, _device: &mut RecordingDevice, color: Color) {
        self.calls.push(BackendCall::Clear(color));
    }

    fn draw_line(
        &mut self,
        _device: &mut RecordingDevice,
        _color: Color,
        from: Vector2,
        to: Vector2,
        _stroke_width: f32,
    ) -> PlatformResult<()> {
        self.calls.push(BackendCall::DrawLine { from, to });
        Ok(())
    }

    fn draw_rectangle(
        &mut self,
        _device: &mut RecordingDevice,
        _color: Color,
        position: Vector2,
        size: Vector2,
        _stroke_width: f32,
    ) -> PlatformResult<()> {
        self.calls.push(BackendCall::DrawRectangle { position, size });
        Ok(())
    }

    fn fill_rectangle(
        &mut self,
        _device: &mut RecordingDevice,
        _color: Color,
        position: Vector2,
        size: Vector2,
    ) -> PlatformResult<()> {
        self.calls.push(BackendCall::FillRectangle { position, size });
        Ok(())
    }

    fn draw_ellipse(
        &mut self,
        _device: &mut RecordingDevice,
        _color: Color,
        ellipse: Ellipse,
        _stroke_width: f32,
    ) -> PlatformResult<()> {
        self.calls.push(BackendCall::DrawEllipse(ellipse));
        Ok(())
    }

    fn fill_ellipse(
        &mut self,
        _device: &mut RecordingDevice,
        _color: Color,
        ellipse: Ellipse,
    ) -> PlatformResult<()> {
        self.calls.push(BackendCall::FillEllipse(ellipse));
        Ok(())
    }

    fn fill_polygon(
        &mut self,
        _device: &mut RecordingDevice,
        _color: Color,
        points: &[Vector2],
    ) -> PlatformResult<()> {
        self.calls.push(BackendCall::FillPolygon(points.to_vec()));
        Ok(())
    }

    fn draw_text(
        &mut self,
        _device: &mut RecordingDevice,
        text: &str,
        _color: Color,
        _font: &FontDescription,
        position: Vector2,
        size: Vector2,
    ) -> PlatformResult<()> {
        self.calls.push(BackendCall::DrawText {
            text: text.to_string(),
            position,
            size,
        });
        Ok(())
    }

    fn measure_text(&mut self, text: &str, font: &FontDescription) -> PlatformResult<Vector2> {
        Ok(Vector2::new(text_width(text), font.size))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    DrawLine { from: Vector2, to: Vector2 },
    DrawRectangle { position: Vector2, size: Vector2 },
    FillRectangle { position: Vector2, size: Vector2 },
    DrawEllipse { position: Vector2, size: Vector2 },
    FillEllipse { position: Vector2, size: Vector2 },
    FillPolygon(Vec<Vector2>),
    DrawText { text: String, position: Vector2 },
}

/// Records what controls draw. Text measures 6 px per char and 12 px high.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub calls: Vec<SurfaceCall>,
}

impl RenderSurface for RecordingSurface {
    fn draw_line(
        &mut self,
        _color: Color,
        from: Vector2,
        to: Vector2,
        _stroke_width: f32,
    ) -> PlatformResult<()> {
        self.calls.push(SurfaceCall::DrawLine { from, to });
        Ok(())
    }

    fn draw_rectangle(
        &mut self,
        _color: Color,
        position: Vector2,
        size: Vector2,
        _stroke_width: f32,
    ) -> PlatformResult<()> {
        self.calls.push(SurfaceCall::DrawRectangle { position, size });
        Ok(())
    }

    fn fill_rectangle(
        &mut self,
        _color: Color,
        position: Vector2,
        size: Vector2,
    ) -> PlatformResult<()> {
        self.calls.push(SurfaceCall::FillRectangle { position, size });
        Ok(())
    }

    fn draw_ellipse(
        &mut self,
        _color: Color,
        position: Vector2,
        size: Vector2,
        _centered: bool,
        _stroke_width: f32,
    ) -> PlatformResult<()> {
        self.calls.push(SurfaceCall::DrawEllipse { position, size });
        Ok(())
    }

    fn fill_ellipse(
        &mut self,
        _color: Color,
        position: Vector2,
        size: Vector2,
        _centered: bool,
    ) -> PlatformResult<()> {
        self.calls.push(SurfaceCall::FillEllipse { position, size });
        Ok(())
    }

    fn fill_polygon(&mut self, _color: Color, points: &[Vector2]) -> PlatformResult<()> {
        self.calls.push(SurfaceCall::FillPolygon(points.to_vec()));
        Ok(())
    }

    fn draw_text(
        &mut self,
        text: &str,
        _color: Color,
        _font: &str,
        position: Vector2,
    ) -> PlatformResult<()> {
        self.calls.push(SurfaceCall::DrawText {
            text: text.to_string(),
            position,
        });
        Ok(())
    }

    fn measure_string(&mut self, text: &str, _font: &str) -> PlatformResult<Vector2> {
        Ok(Vector2::new(text_width(text), SURFACE_LINE_HEIGHT))
    }

    fn back_color(&self) -> Color {
        Color::TRANSPARENT
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    Move(WindowHandle, Point),
    Resize(WindowHandle, Size),
    PlaceAbove {
        target: WindowHandle,
        overlay: WindowHandle,
        rect: WindowRect,
    },
    ExtendFrame(WindowHandle),
    ShowNoActivate(WindowHandle),
    SetTopmost(WindowHandle, bool),
    BringToTop(WindowHandle),
    MakeClickThrough(WindowHandle),
    RequestExit,
}

/// Window system with scripted rectangles. Unknown handles fail to query.
#[derive(Debug, Default)]
pub struct FakePlatform {
    pub windows: HashMap<WindowHandle, WindowInfo>,
    pub foreground: WindowHandle,
    pub cursor: Vector2,
    pub keys_down: HashSet<VirtualKey>,
    pub calls: Vec<PlatformCall>,
}

impl FakePlatform {
    /// Registers a window whose outer and client rectangles coincide.
    pub fn with_window(mut self, window: WindowHandle, rect: WindowRect) -> Self {
        self.set_rect(window, rect);
        self
    }

    pub fn set_rect(&mut self, window: WindowHandle, rect: WindowRect) {
        self.windows.insert(
            window,
            WindowInfo {
                window: rect,
                client: rect,
            },
        );
    }

    pub fn count(&self, predicate: impl Fn(&PlatformCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }
}

impl WindowPlatform for FakePlatform {
    fn window_info(&self, window: WindowHandle) -> PlatformResult<WindowInfo> {
        self.windows
            .get(&window)
            .copied()
            .ok_or_else(|| PlatformError::WindowQueryFailed {
                handle: window,
                reason: "no such window".into(),
            })
    }

    fn foreground_window(&self) -> WindowHandle {
        self.foreground
    }

    fn move_window(&mut self, window: WindowHandle, position: Point) -> PlatformResult<()> {
        self.calls.push(PlatformCall::Move(window, position));
        Ok(())
    }

    fn resize_window(&mut self, window: WindowHandle, size: Size) -> PlatformResult<()> {
        self.calls.push(PlatformCall::Resize(window, size));
        Ok(())
    }

    fn place_above(
        &mut self,
        target: WindowHandle,
        overlay: WindowHandle,
        rect: WindowRect,
    ) -> PlatformResult<()> {
        self.calls.push(PlatformCall::PlaceAbove {
            target,
            overlay,
            rect,
        });
        Ok(())
    }

    fn extend_frame_into_client_area(&mut self, window: WindowHandle) -> PlatformResult<()> {
        self.calls.push(PlatformCall::ExtendFrame(window));
        Ok(())
    }

    fn cursor_position(&self, _window: WindowHandle) -> PlatformResult<Vector2> {
        Ok(self.cursor)
    }

    fn is_key_down(&self, key: VirtualKey) -> bool {
        self.keys_down.contains(&key)
    }

    fn show_no_activate(&mut self, window: WindowHandle) -> PlatformResult<()> {
        self.calls.push(PlatformCall::ShowNoActivate(window));
        Ok(())
    }

    fn set_topmost(&mut self, window: WindowHandle, topmost: bool) -> PlatformResult<()> {
        self.calls.push(PlatformCall::SetTopmost(window, topmost));
        Ok(())
    }

    fn bring_to_top(&mut self, window: WindowHandle) -> PlatformResult<()> {
        self.calls.push(PlatformCall::BringToTop(window));
        Ok(())
    }

    fn make_click_through(&mut self, window: WindowHandle) -> PlatformResult<()> {
        self.calls.push(PlatformCall::MakeClickThrough(window));
        Ok(())
    }

    fn request_exit(&mut self) {
        self.calls.push(PlatformCall::RequestExit);
    }
}
