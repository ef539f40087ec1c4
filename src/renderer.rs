/*
 * Device lifecycle and immediate-mode drawing. `Renderer` owns the native
 * device produced by a `GraphicsBackend`, guards every primitive against a
 * missing device, keeps the name -> font registry, and heals a lost device
 * inside `end_draw`. Controls only ever see the object-safe `RenderSurface`.
 */
use crate::error::{PlatformError, Result as PlatformResult};
use crate::types::{Color, FontDescription, FontStyle, FontWeight, Size, Vector2, WindowHandle};

use std::collections::HashMap;

/// Properties a device is created with; reused verbatim when it is recreated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub window: WindowHandle,
    pub pixel_size: Size,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    pub center: Vector2,
    pub radius_x: f32,
    pub radius_y: f32,
}

impl Ellipse {
    /// `position` is the center when `centered`, otherwise the bounding box's top-left corner.
    pub fn from_bounds(position: Vector2, size: Vector2, centered: bool) -> Self {
        let center = if centered {
            position
        } else {
            Vector2::new(position.x + size.x / 2.0, position.y + size.y / 2.0)
        };
        Self {
            center,
            radius_x: size.x / 2.0,
            radius_y: size.y / 2.0,
        }
    }
}

/*
 * Native 2D drawing binding. Implementations hold whatever process-wide
 * factories they need between `startup` and `shutdown`; a `Device` is one
 * render target bound to a window.
 */
pub trait GraphicsBackend {
    type Device;
    type Font;

    fn startup(&mut self) -> PlatformResult<()>;
    fn shutdown(&mut self);

    fn create_device(&mut self, target: &RenderTarget) -> PlatformResult<Self::Device>;
    fn release_device(&mut self, device: Self::Device);
    fn resize(&mut self, device: &mut Self::Device, size: Size) -> PlatformResult<()>;

    fn create_font(&mut self, description: &FontDescription) -> PlatformResult<Self::Font>;
    fn release_font(&mut self, font: Self::Font);

    fn begin_draw(&mut self, device: &mut Self::Device);
    /// Must return `PlatformError::DeviceLost` when the device has to be recreated.
    fn end_draw(&mut self, device: &mut Self::Device) -> PlatformResult<()>;
    fn clear(&mut self, device: &mut Self::Device, color: Color);

    fn draw_line(
        &mut self,
        device: &mut Self::Device,
        color: Color,
        from: Vector2,
        to: Vector2,
        stroke_width: f32,
    ) -> PlatformResult<()>;
    fn draw_rectangle(
        &mut self,
        device: &mut Self::Device,
        color: Color,
        position: Vector2,
        size: Vector2,
        stroke_width: f32,
    ) -> PlatformResult<()>;
    fn fill_rectangle(
        &mut self,
        device: &mut Self::Device,
        color: Color,
        position: Vector2,
        size: Vector2,
    ) -> PlatformResult<()>;
    fn draw_ellipse(
        &mut self,
        device: &mut Self::Device,
        color: Color,
        ellipse: Ellipse,
        stroke_width: f32,
    ) -> PlatformResult<()>;
    fn fill_ellipse(
        &mut self,
        device: &mut Self::Device,
        color: Color,
        ellipse: Ellipse,
    ) -> PlatformResult<()>;
    fn fill_polygon(
        &mut self,
        device: &mut Self::Device,
        color: Color,
        points: &[Vector2],
    ) -> PlatformResult<()>;
    fn draw_text(
        &mut self,
        device: &mut Self::Device,
        text: &str,
        color: Color,
        font: &Self::Font,
        position: Vector2,
        size: Vector2,
    ) -> PlatformResult<()>;
    fn measure_text(&mut self, text: &str, font: &Self::Font) -> PlatformResult<Vector2>;
}

/// Drawing API handed to controls and draw-event subscribers.
pub trait RenderSurface {
    fn draw_line(&mut self, color: Color, from: Vector2, to: Vector2, stroke_width: f32)
    -> PlatformResult<()>;
    fn draw_rectangle(
        &mut self,
        color: Color,
        position: Vector2,
        size: Vector2,
        stroke_width: f32,
    ) -> PlatformResult<()>;
    fn fill_rectangle(&mut self, color: Color, position: Vector2, size: Vector2)
    -> PlatformResult<()>;
    fn draw_ellipse(
        &mut self,
        color: Color,
        position: Vector2,
        size: Vector2,
        centered: bool,
        stroke_width: f32,
    ) -> PlatformResult<()>;
    fn fill_ellipse(
        &mut self,
        color: Color,
        position: Vector2,
        size: Vector2,
        centered: bool,
    ) -> PlatformResult<()>;
    fn fill_polygon(&mut self, color: Color, points: &[Vector2]) -> PlatformResult<()>;
    fn draw_text(&mut self, text: &str, color: Color, font: &str, position: Vector2)
    -> PlatformResult<()>;
    fn measure_string(&mut self, text: &str, font: &str) -> PlatformResult<Vector2>;
    /// Color the frame is cleared to; transparent for an overlay.
    fn back_color(&self) -> Color;
}

pub struct Renderer<B: GraphicsBackend> {
    backend: B,
    device: Option<B::Device>,
    target: Option<RenderTarget>,
    fonts: HashMap<String, B::Font>,
    disposing: bool,
    device_generation: u64,
}

impl<B: GraphicsBackend> Renderer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            device: None,
            target: None,
            fonts: HashMap::new(),
            disposing: false,
            device_generation: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn has_device(&self) -> bool {
        self.device.is_some()
    }

    pub fn device(&self) -> Option<&B::Device> {
        self.device.as_ref()
    }

    /// Increases every time a device is created; identifies the live device.
    pub fn device_generation(&self) -> u64 {
        self.device_generation
    }

    pub fn target(&self) -> Option<RenderTarget> {
        self.target
    }

    pub fn is_disposing(&self) -> bool {
        self.disposing
    }

    /*
     * Creates the factories and a fresh device bound to `window`. A device
     * that is still alive is destroyed first so fonts and factories never
     * leak across initializations.
     */
    pub fn initialize_device(&mut self, window: WindowHandle, size: Size) -> PlatformResult<()> {
        if self.device.is_some() {
            log::warn!("Renderer: initialize_device called with a live device; recreating it");
            self.destroy_device();
        }
        if window.is_null() {
            return Err(PlatformError::InvalidHandle(
                "render target window handle is null".into(),
            ));
        }

        let target = RenderTarget {
            window,
            pixel_size: size,
        };
        self.backend.startup()?;
        let device = match self.backend.create_device(&target) {
            Ok(device) => device,
            Err(e) => {
                log::error!("Renderer: device creation for {window:?} failed: {e}");
                self.backend.shutdown();
                return Err(e);
            }
        };

        self.device = Some(device);
        self.target = Some(target);
        self.disposing = false;
        self.device_generation += 1;
        log::debug!(
            "Renderer: device #{} created for {window:?} at {}x{}",
            self.device_generation,
            size.width,
            size.height
        );
        Ok(())
    }

    /// Releases fonts, then the device, then the factories. Safe to call without a device.
    pub fn destroy_device(&mut self) {
        let Some(device) = self.device.take() else {
            log::debug!("Renderer: destroy_device called without a device; nothing to do");
            return;
        };

        let font_count = self.fonts.len();
        for (_, font) in self.fonts.drain() {
            self.backend.release_font(font);
        }
        self.backend.release_device(device);
        self.backend.shutdown();
        self.target = None;
        log::debug!(
            "Renderer: device #{} destroyed ({font_count} fonts released)",
            self.device_generation
        );
    }

    pub fn dispose(&mut self) {
        if self.device.is_some() && !self.disposing {
            self.disposing = true;
            self.destroy_device();
        }
    }

    pub fn resize(&mut self, size: Size) -> PlatformResult<()> {
        let device = self
            .device
            .as_mut()
            .ok_or(PlatformError::DeviceNotInitialized)?;
        self.backend.resize(device, size)?;
        if let Some(target) = self.target.as_mut() {
            target.pixel_size = size;
        }
        log::debug!("Renderer: resized to {}x{}", size.width, size.height);
        Ok(())
    }

    pub fn begin_draw(&mut self) -> PlatformResult<()> {
        let device = self
            .device
            .as_mut()
            .ok_or(PlatformError::DeviceNotInitialized)?;
        self.backend.begin_draw(device);
        Ok(())
    }

    /*
     * Ends the frame. A lost device is replaced by a new one created from the
     * same target properties and the error is swallowed; the frame is simply
     * dropped. No recreation happens while the renderer is being disposed.
     */
    pub fn end_draw(&mut self) -> PlatformResult<()> {
        let device = self
            .device
            .as_mut()
            .ok_or(PlatformError::DeviceNotInitialized)?;

        match self.backend.end_draw(device) {
            Ok(()) => Ok(()),
            Err(e) if e.is_device_lost() => {
                if self.disposing {
                    log::debug!("Renderer: device lost during disposal; not recreating");
                    return Ok(());
                }
                log::warn!("Renderer: {e}; recreating device");
                self.recreate_device()
            }
            Err(e) => Err(e),
        }
    }

    fn recreate_device(&mut self) -> PlatformResult<()> {
        let target = self.target.ok_or(PlatformError::DeviceNotInitialized)?;
        if let Some(old) = self.device.take() {
            self.backend.release_device(old);
        }
        match self.backend.create_device(&target) {
            Ok(device) => {
                self.device = Some(device);
                self.device_generation += 1;
                log::debug!("Renderer: device #{} recreated", self.device_generation);
                Ok(())
            }
            Err(e) => {
                log::error!("Renderer: device recreation failed: {e}");
                Err(e)
            }
        }
    }

    pub fn clear(&mut self, color: Color) -> PlatformResult<()> {
        let device = self
            .device
            .as_mut()
            .ok_or(PlatformError::DeviceNotInitialized)?;
        self.backend.clear(device, color);
        Ok(())
    }

    pub fn create_font(
        &mut self,
        name: &str,
        family: &str,
        size: f32,
        style: FontStyle,
        weight: FontWeight,
    ) -> PlatformResult<&B::Font> {
        if self.device.is_none() {
            return Err(PlatformError::DeviceNotInitialized);
        }
        if self.fonts.contains_key(name) {
            return Err(PlatformError::DuplicateFont(name.to_string()));
        }
        let font = self.backend.create_font(&FontDescription {
            family: family.to_string(),
            size,
            style,
            weight,
        })?;
        log::debug!("Renderer: registered font '{name}' ({family}, {size}pt)");
        Ok(self.fonts.entry(name.to_string()).or_insert(font))
    }

    pub fn font(&self, name: &str) -> PlatformResult<&B::Font> {
        if self.device.is_none() {
            return Err(PlatformError::DeviceNotInitialized);
        }
        self.fonts
            .get(name)
            .ok_or_else(|| PlatformError::FontNotFound(name.to_string()))
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    /// Resolves the device and a registered font in one borrow split.
    fn device_and_font(&mut self, font: &str) -> PlatformResult<(&mut B, &mut B::Device, &B::Font)> {
        let device = self
            .device
            .as_mut()
            .ok_or(PlatformError::DeviceNotInitialized)?;
        let font = self
            .fonts
            .get(font)
            .ok_or_else(|| PlatformError::FontNotFound(font.to_string()))?;
        Ok((&mut self.backend, device, font))
    }

    fn device_mut(&mut self) -> PlatformResult<(&mut B, &mut B::Device)> {
        let device = self
            .device
            .as_mut()
            .ok_or(PlatformError::DeviceNotInitialized)?;
        Ok((&mut self.backend, device))
    }
}

impl<B: GraphicsBackend> RenderSurface for Renderer<B> {
    fn draw_line(
        &mut self,
        color: Color,
        from: Vector2,
        to: Vector2,
        stroke_width: f32,
    ) -> PlatformResult<()> {
        let (backend, device) = self.device_mut()?;
        backend.draw_line(device, color, from, to, stroke_width)
    }

    fn draw_rectangle(
        &mut self,
        color: Color,
        position: Vector2,
        size: Vector2,
        stroke_width: f32,
    ) -> PlatformResult<()> {
        let (backend, device) = self.device_mut()?;
        backend.draw_rectangle(device, color, position, size, stroke_width)
    }

    fn fill_rectangle(
        &mut self,
        color: Color,
        position: Vector2,
        size: Vector2,
    ) -> PlatformResult<()> {
        let (backend, device) = self.device_mut()?;
        backend.fill_rectangle(device, color, position, size)
    }

    fn draw_ellipse(
        &mut self,
        color: Color,
        position: Vector2,
        size: Vector2,
        centered: bool,
        stroke_width: f32,
    ) -> PlatformResult<()> {
        let (backend, device) = self.device_mut()?;
        backend.draw_ellipse(
            device,
            color,
            Ellipse::from_bounds(position, size, centered),
            stroke_width,
        )
    }

    fn fill_ellipse(
        &mut self,
        color: Color,
        position: Vector2,
        size: Vector2,
        centered: bool,
    ) -> PlatformResult<()> {
        let (backend, device) = self.device_mut()?;
        backend.fill_ellipse(device, color, Ellipse::from_bounds(position, size, centered))
    }

    fn fill_polygon(&mut self, color: Color, points: &[Vector2]) -> PlatformResult<()> {
        let (backend, device) = self.device_mut()?;
        if points.is_empty() {
            return Err(PlatformError::OperationFailed(
                "fill_polygon needs at least one point".into(),
            ));
        }
        backend.fill_polygon(device, color, points)
    }

    fn draw_text(
        &mut self,
        text: &str,
        color: Color,
        font: &str,
        position: Vector2,
    ) -> PlatformResult<()> {
        let (backend, device, font) = self.device_and_font(font)?;
        let size = backend.measure_text(text, font)?;
        backend.draw_text(device, text, color, font, position, size)
    }

    fn measure_string(&mut self, text: &str, font: &str) -> PlatformResult<Vector2> {
        let (backend, _, font) = self.device_and_font(font)?;
        backend.measure_text(text, font)
    }

    fn back_color(&self) -> Color {
        Color::TRANSPARENT
    }
}

impl<B: GraphicsBackend> Drop for Renderer<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BackendCall, RecordingBackend};

    const WINDOW: WindowHandle = WindowHandle(0x100);

    fn live_renderer() -> Renderer<RecordingBackend> {
        let mut renderer = Renderer::new(RecordingBackend::default());
        renderer
            .initialize_device(WINDOW, Size::new(640, 480))
            .expect("device init");
        renderer
    }

    fn assert_not_initialized(result: PlatformResult<()>) {
        assert!(matches!(result, Err(PlatformError::DeviceNotInitialized)));
    }

    fn exercise_primitives(renderer: &mut Renderer<RecordingBackend>) -> Vec<PlatformResult<()>> {
        let p = Vector2::new(1.0, 2.0);
        let s = Vector2::new(10.0, 20.0);
        vec![
            renderer.begin_draw(),
            renderer.clear(Color::TRANSPARENT),
            renderer.draw_line(Color::WHITE, p, s, 1.0),
            renderer.draw_rectangle(Color::WHITE, p, s, 1.0),
            renderer.fill_rectangle(Color::WHITE, p, s),
            renderer.draw_ellipse(Color::WHITE, p, s, false, 1.0),
            renderer.fill_ellipse(Color::WHITE, p, s, true),
            renderer.fill_polygon(Color::WHITE, &[p, s, Vector2::ZERO]),
            renderer.resize(Size::new(10, 10)),
            renderer.end_draw(),
        ]
    }

    #[test]
    fn primitives_fail_before_initialize_device() {
        let mut renderer = Renderer::new(RecordingBackend::default());
        for result in exercise_primitives(&mut renderer) {
            assert_not_initialized(result);
        }
        assert!(matches!(
            renderer.measure_string("x", "default"),
            Err(PlatformError::DeviceNotInitialized)
        ));
        assert!(renderer.backend().calls.is_empty());
    }

    #[test]
    fn primitives_succeed_between_initialize_and_destroy() {
        let mut renderer = live_renderer();
        for result in exercise_primitives(&mut renderer) {
            assert!(result.is_ok(), "unexpected failure: {result:?}");
        }
    }

    #[test]
    fn primitives_fail_after_destroy_device() {
        let mut renderer = live_renderer();
        renderer.destroy_device();
        assert_eq!(renderer.target(), None);
        for result in exercise_primitives(&mut renderer) {
            assert_not_initialized(result);
        }
    }

    #[test]
    fn end_draw_recreates_a_lost_device_without_error() {
        // Arrange
        let mut renderer = live_renderer();
        let before = renderer.device().map(|d| d.id);
        renderer.backend_mut().lose_device_on_next_end_draw = true;

        // Act
        renderer.begin_draw().unwrap();
        let result = renderer.end_draw();

        // Assert
        assert!(result.is_ok());
        let after = renderer.device().map(|d| d.id);
        assert_ne!(before, after);
        assert_eq!(renderer.device_generation(), 2);
        assert_eq!(
            renderer.device().map(|d| d.target),
            Some(RenderTarget {
                window: WINDOW,
                pixel_size: Size::new(640, 480)
            })
        );
    }

    #[test]
    fn end_draw_does_not_recreate_while_disposing() {
        let mut renderer = live_renderer();
        renderer.disposing = true;
        renderer.backend_mut().lose_device_on_next_end_draw = true;

        assert!(renderer.end_draw().is_ok());
        assert_eq!(renderer.device_generation(), 1);
        let creations = renderer
            .backend()
            .calls
            .iter()
            .filter(|c| matches!(c, BackendCall::CreateDevice(_)))
            .count();
        assert_eq!(creations, 1);
    }

    #[test]
    fn non_device_lost_errors_propagate_from_end_draw() {
        let mut renderer = live_renderer();
        renderer.backend_mut().fail_next_end_draw = true;
        assert!(matches!(
            renderer.end_draw(),
            Err(PlatformError::OperationFailed(_))
        ));
        assert_eq!(renderer.device_generation(), 1);
    }

    #[test]
    fn recreated_device_uses_the_resized_target() {
        let mut renderer = live_renderer();
        renderer.resize(Size::new(800, 600)).unwrap();
        renderer.backend_mut().lose_device_on_next_end_draw = true;
        renderer.end_draw().unwrap();
        assert_eq!(
            renderer.device().map(|d| d.target.pixel_size),
            Some(Size::new(800, 600))
        );
    }

    #[test]
    fn destroy_releases_fonts_before_device_and_factories() {
        let mut renderer = live_renderer();
        renderer
            .create_font("default", "Segoe UI", 12.0, FontStyle::Normal, FontWeight::Normal)
            .unwrap();
        renderer.backend_mut().calls.clear();

        renderer.destroy_device();
        renderer.destroy_device();

        assert_eq!(
            renderer.backend().calls,
            vec![
                BackendCall::ReleaseFont("Segoe UI".into()),
                BackendCall::ReleaseDevice(1),
                BackendCall::Shutdown,
            ]
        );
        assert_eq!(renderer.font_count(), 0);
    }

    #[test]
    fn fonts_are_unique_by_name_and_survive_device_loss() {
        let mut renderer = live_renderer();
        renderer
            .create_font("title", "Consolas", 14.0, FontStyle::Normal, FontWeight::Bold)
            .unwrap();
        assert!(matches!(
            renderer.create_font("title", "Arial", 9.0, FontStyle::Italic, FontWeight::Light),
            Err(PlatformError::DuplicateFont(_))
        ));

        renderer.backend_mut().lose_device_on_next_end_draw = true;
        renderer.end_draw().unwrap();

        assert_eq!(renderer.font("title").unwrap().family, "Consolas");
        assert!(matches!(
            renderer.font("missing"),
            Err(PlatformError::FontNotFound(_))
        ));
    }

    #[test]
    fn draw_text_measures_before_drawing() {
        let mut renderer = live_renderer();
        renderer
            .create_font("default", "Segoe UI", 10.0, FontStyle::Normal, FontWeight::Normal)
            .unwrap();
        renderer
            .draw_text("hello", Color::WHITE, "default", Vector2::new(3.0, 4.0))
            .unwrap();
        let measured = renderer.measure_string("hello", "default").unwrap();
        assert_eq!(measured, Vector2::new(30.0, 10.0));
        assert!(renderer.backend().calls.contains(&BackendCall::DrawText {
            text: "hello".into(),
            position: Vector2::new(3.0, 4.0),
            size: Vector2::new(30.0, 10.0),
        }));
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut renderer = live_renderer();
        renderer.dispose();
        renderer.dispose();
        assert!(!renderer.has_device());
        assert!(renderer.is_disposing());
        let shutdowns = renderer
            .backend()
            .calls
            .iter()
            .filter(|c| **c == BackendCall::Shutdown)
            .count();
        assert_eq!(shutdowns, 1);
    }

    #[test]
    fn initialize_after_dispose_recovers_from_device_loss_again() {
        let mut renderer = live_renderer();
        renderer.dispose();
        renderer
            .initialize_device(WINDOW, Size::new(320, 200))
            .unwrap();
        assert!(!renderer.is_disposing());

        renderer.backend_mut().lose_device_on_next_end_draw = true;
        renderer.begin_draw().unwrap();
        assert!(renderer.end_draw().is_ok());

        assert!(renderer.has_device());
        assert_eq!(renderer.device_generation(), 3);
        assert_eq!(
            renderer.device().map(|d| d.target.pixel_size),
            Some(Size::new(320, 200))
        );
    }

    #[test]
    fn ellipse_bounds_are_centered_on_request() {
        let corner = Ellipse::from_bounds(Vector2::new(0.0, 0.0), Vector2::new(10.0, 4.0), false);
        assert_eq!(corner.center, Vector2::new(5.0, 2.0));
        let centered = Ellipse::from_bounds(Vector2::new(7.0, 7.0), Vector2::new(10.0, 4.0), true);
        assert_eq!(centered.center, Vector2::new(7.0, 7.0));
        assert_eq!((centered.radius_x, centered.radius_y), (5.0, 2.0));
    }

    #[test]
    fn initialize_rejects_null_window() {
        let mut renderer = Renderer::new(RecordingBackend::default());
        assert!(matches!(
            renderer.initialize_device(WindowHandle::NULL, Size::new(1, 1)),
            Err(PlatformError::InvalidHandle(_))
        ));
        assert!(!renderer.has_device());
    }
}
