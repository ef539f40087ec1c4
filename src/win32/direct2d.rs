/*
 * Direct2D `GraphicsBackend`. The device is an `ID2D1HwndRenderTarget` bound
 * to the overlay window with premultiplied alpha, so pixels cleared to a
 * transparent color let the tracked window show through. A single solid
 * brush per device is recolored for every primitive.
 */
use super::hwnd_from;
use crate::error::{PlatformError, Result as PlatformResult};
use crate::renderer::{Ellipse, GraphicsBackend, RenderTarget};
use crate::types::{Color, FontDescription, FontStyle, FontWeight, Size, Vector2};

use windows::Win32::Graphics::Direct2D::Common::{
    D2D_RECT_F, D2D_SIZE_U, D2D1_ALPHA_MODE_PREMULTIPLIED, D2D1_COLOR_F,
    D2D1_FIGURE_BEGIN_FILLED, D2D1_FIGURE_END_CLOSED, D2D1_PIXEL_FORMAT,
};
use windows::Win32::Graphics::Direct2D::{
    D2D1_BRUSH_PROPERTIES, D2D1_DRAW_TEXT_OPTIONS_NONE, D2D1_ELLIPSE,
    D2D1_FACTORY_TYPE_SINGLE_THREADED, D2D1_FEATURE_LEVEL_DEFAULT,
    D2D1_HWND_RENDER_TARGET_PROPERTIES, D2D1_PRESENT_OPTIONS_IMMEDIATELY,
    D2D1_RENDER_TARGET_PROPERTIES, D2D1_RENDER_TARGET_TYPE_DEFAULT,
    D2D1_RENDER_TARGET_USAGE_NONE, D2D1CreateFactory, ID2D1Factory,
    ID2D1HwndRenderTarget, ID2D1SolidColorBrush,
};
use windows::Win32::Graphics::DirectWrite::{
    DWRITE_FACTORY_TYPE_SHARED, DWRITE_FONT_STRETCH_NORMAL, DWRITE_FONT_STYLE,
    DWRITE_FONT_STYLE_ITALIC, DWRITE_FONT_STYLE_NORMAL, DWRITE_FONT_STYLE_OBLIQUE,
    DWRITE_FONT_WEIGHT, DWRITE_FONT_WEIGHT_BOLD, DWRITE_FONT_WEIGHT_LIGHT,
    DWRITE_FONT_WEIGHT_NORMAL, DWRITE_FONT_WEIGHT_SEMI_BOLD, DWRITE_MEASURING_MODE_NATURAL,
    DWRITE_TEXT_METRICS, DWriteCreateFactory, IDWriteFactory, IDWriteTextFormat,
};
use windows::Win32::Foundation::D2DERR_RECREATE_TARGET;
use windows::Win32::Graphics::Dxgi::Common::DXGI_FORMAT_B8G8R8A8_UNORM;
use windows::core::{HSTRING, w};
use windows_numerics::{Matrix3x2, Vector2 as D2D_POINT_2F};

pub struct Direct2DDevice {
    target: ID2D1HwndRenderTarget,
    brush: ID2D1SolidColorBrush,
}

impl Direct2DDevice {
    fn brush(&self, color: Color) -> &ID2D1SolidColorBrush {
        unsafe { self.brush.SetColor(&color_f(color)) };
        &self.brush
    }
}

#[derive(Default)]
pub struct Direct2DBackend {
    factory: Option<ID2D1Factory>,
    write_factory: Option<IDWriteFactory>,
}

impl Direct2DBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn factory(&self) -> PlatformResult<&ID2D1Factory> {
        self.factory.as_ref().ok_or_else(|| {
            PlatformError::InitializationFailed("Direct2D factory was not started".into())
        })
    }

    fn write_factory(&self) -> PlatformResult<&IDWriteFactory> {
        self.write_factory.as_ref().ok_or_else(|| {
            PlatformError::InitializationFailed("DirectWrite factory was not started".into())
        })
    }
}

pub(crate) fn color_f(color: Color) -> D2D1_COLOR_F {
    D2D1_COLOR_F {
        r: f32::from(color.r) / 255.0,
        g: f32::from(color.g) / 255.0,
        b: f32::from(color.b) / 255.0,
        a: f32::from(color.a) / 255.0,
    }
}

fn point(v: Vector2) -> D2D_POINT_2F {
    D2D_POINT_2F { X: v.x, Y: v.y }
}

fn rect(position: Vector2, size: Vector2) -> D2D_RECT_F {
    D2D_RECT_F {
        left: position.x,
        top: position.y,
        right: position.x + size.x,
        bottom: position.y + size.y,
    }
}

fn ellipse(e: Ellipse) -> D2D1_ELLIPSE {
    D2D1_ELLIPSE {
        point: point(e.center),
        radiusX: e.radius_x,
        radiusY: e.radius_y,
    }
}

fn pixel_size(size: Size) -> D2D_SIZE_U {
    D2D_SIZE_U {
        width: size.width.max(0) as u32,
        height: size.height.max(0) as u32,
    }
}

fn font_weight(weight: FontWeight) -> DWRITE_FONT_WEIGHT {
    match weight {
        FontWeight::Light => DWRITE_FONT_WEIGHT_LIGHT,
        FontWeight::Normal => DWRITE_FONT_WEIGHT_NORMAL,
        FontWeight::SemiBold => DWRITE_FONT_WEIGHT_SEMI_BOLD,
        FontWeight::Bold => DWRITE_FONT_WEIGHT_BOLD,
    }
}

fn font_style(style: FontStyle) -> DWRITE_FONT_STYLE {
    match style {
        FontStyle::Normal => DWRITE_FONT_STYLE_NORMAL,
        FontStyle::Oblique => DWRITE_FONT_STYLE_OBLIQUE,
        FontStyle::Italic => DWRITE_FONT_STYLE_ITALIC,
    }
}

impl GraphicsBackend for Direct2DBackend {
    type Device = Direct2DDevice;
    type Font = IDWriteTextFormat;

    fn startup(&mut self) -> PlatformResult<()> {
        if self.factory.is_none() {
            let factory: ID2D1Factory =
                unsafe { D2D1CreateFactory(D2D1_FACTORY_TYPE_SINGLE_THREADED, None)? };
            self.factory = Some(factory);
        }
        if self.write_factory.is_none() {
            let write_factory: IDWriteFactory =
                unsafe { DWriteCreateFactory(DWRITE_FACTORY_TYPE_SHARED)? };
            self.write_factory = Some(write_factory);
        }
        log::debug!("Direct2DBackend: factories ready");
        Ok(())
    }

    fn shutdown(&mut self) {
        self.write_factory = None;
        self.factory = None;
        log::debug!("Direct2DBackend: factories released");
    }

    fn create_device(&mut self, target: &RenderTarget) -> PlatformResult<Direct2DDevice> {
        let factory = self.factory()?;
        let properties = D2D1_RENDER_TARGET_PROPERTIES {
            r#type: D2D1_RENDER_TARGET_TYPE_DEFAULT,
            pixelFormat: D2D1_PIXEL_FORMAT {
                format: DXGI_FORMAT_B8G8R8A8_UNORM,
                alphaMode: D2D1_ALPHA_MODE_PREMULTIPLIED,
            },
            dpiX: 0.0,
            dpiY: 0.0,
            usage: D2D1_RENDER_TARGET_USAGE_NONE,
            minLevel: D2D1_FEATURE_LEVEL_DEFAULT,
        };
        let hwnd_properties = D2D1_HWND_RENDER_TARGET_PROPERTIES {
            hwnd: hwnd_from(target.window),
            pixelSize: pixel_size(target.pixel_size),
            presentOptions: D2D1_PRESENT_OPTIONS_IMMEDIATELY,
        };
        let brush_properties = D2D1_BRUSH_PROPERTIES {
            opacity: 1.0,
            transform: Matrix3x2::identity(),
        };

        unsafe {
            let render_target = factory.CreateHwndRenderTarget(&properties, &hwnd_properties)?;
            let brush = render_target
                .CreateSolidColorBrush(&color_f(Color::WHITE), Some(&brush_properties))?;
            Ok(Direct2DDevice {
                target: render_target,
                brush,
            })
        }
    }

    fn release_device(&mut self, device: Direct2DDevice) {
        drop(device);
    }

    fn resize(&mut self, device: &mut Direct2DDevice, size: Size) -> PlatformResult<()> {
        unsafe { device.target.Resize(&pixel_size(size))? };
        Ok(())
    }

    fn create_font(&mut self, description: &FontDescription) -> PlatformResult<IDWriteTextFormat> {
        let write_factory = self.write_factory()?;
        let format = unsafe {
            write_factory.CreateTextFormat(
                &HSTRING::from(description.family.as_str()),
                None,
                font_weight(description.weight),
                font_style(description.style),
                DWRITE_FONT_STRETCH_NORMAL,
                description.size,
                w!("en-us"),
            )?
        };
        Ok(format)
    }

    fn release_font(&mut self, font: IDWriteTextFormat) {
        drop(font);
    }

    fn begin_draw(&mut self, device: &mut Direct2DDevice) {
        unsafe { device.target.BeginDraw() };
    }

    fn end_draw(&mut self, device: &mut Direct2DDevice) -> PlatformResult<()> {
        match unsafe { device.target.EndDraw(None, None) } {
            Ok(()) => Ok(()),
            Err(e) if e.code() == D2DERR_RECREATE_TARGET => {
                Err(PlatformError::DeviceLost(e.message()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&mut self, device: &mut Direct2DDevice, color: Color) {
        unsafe { device.target.Clear(Some(&color_f(color))) };
    }

    fn draw_line(
        &mut self,
        device: &mut Direct2DDevice,
        color: Color,
        from: Vector2,
        to: Vector2,
        stroke_width: f32,
    ) -> PlatformResult<()> {
        let brush = device.brush(color);
        unsafe {
            device
                .target
                .DrawLine(point(from), point(to), brush, stroke_width, None)
        };
        Ok(())
    }

    fn draw_rectangle(
        &mut self,
        device: &mut Direct2DDevice,
        color: Color,
        position: Vector2,
        size: Vector2,
        stroke_width: f32,
    ) -> PlatformResult<()> {
        let brush = device.brush(color);
        unsafe {
            device
                .target
                .DrawRectangle(&rect(position, size), brush, stroke_width, None)
        };
        Ok(())
    }

    fn fill_rectangle(
        &mut self,
        device: &mut Direct2DDevice,
        color: Color,
        position: Vector2,
        size: Vector2,
    ) -> PlatformResult<()> {
        let brush = device.brush(color);
        unsafe { device.target.FillRectangle(&rect(position, size), brush) };
        Ok(())
    }

    fn draw_ellipse(
        &mut self,
        device: &mut Direct2DDevice,
        color: Color,
        shape: Ellipse,
        stroke_width: f32,
    ) -> PlatformResult<()> {
        let brush = device.brush(color);
        unsafe {
            device
                .target
                .DrawEllipse(&ellipse(shape), brush, stroke_width, None)
        };
        Ok(())
    }

    fn fill_ellipse(
        &mut self,
        device: &mut Direct2DDevice,
        color: Color,
        shape: Ellipse,
    ) -> PlatformResult<()> {
        let brush = device.brush(color);
        unsafe { device.target.FillEllipse(&ellipse(shape), brush) };
        Ok(())
    }

    fn fill_polygon(
        &mut self,
        device: &mut Direct2DDevice,
        color: Color,
        points: &[Vector2],
    ) -> PlatformResult<()> {
        let Some((first, rest)) = points.split_first() else {
            return Err(PlatformError::OperationFailed(
                "a polygon needs at least one point".into(),
            ));
        };
        let factory = self.factory()?;
        let outline: Vec<D2D_POINT_2F> = rest.iter().copied().map(point).collect();
        unsafe {
            let geometry = factory.CreatePathGeometry()?;
            let sink = geometry.Open()?;
            sink.BeginFigure(point(*first), D2D1_FIGURE_BEGIN_FILLED);
            sink.AddLines(&outline);
            sink.EndFigure(D2D1_FIGURE_END_CLOSED);
            sink.Close()?;

            let brush = device.brush(color);
            device.target.FillGeometry(&geometry, brush, None);
        }
        Ok(())
    }

    fn draw_text(
        &mut self,
        device: &mut Direct2DDevice,
        text: &str,
        color: Color,
        font: &IDWriteTextFormat,
        position: Vector2,
        size: Vector2,
    ) -> PlatformResult<()> {
        let wide: Vec<u16> = text.encode_utf16().collect();
        let brush = device.brush(color);
        unsafe {
            device.target.DrawText(
                &wide,
                font,
                &rect(position, size),
                brush,
                D2D1_DRAW_TEXT_OPTIONS_NONE,
                DWRITE_MEASURING_MODE_NATURAL,
            )
        };
        Ok(())
    }

    fn measure_text(&mut self, text: &str, font: &IDWriteTextFormat) -> PlatformResult<Vector2> {
        let write_factory = self.write_factory()?;
        let wide: Vec<u16> = text.encode_utf16().collect();
        let mut metrics = DWRITE_TEXT_METRICS::default();
        unsafe {
            let layout = write_factory.CreateTextLayout(&wide, font, f32::MAX, f32::MAX)?;
            layout.GetMetrics(&mut metrics)?;
        }
        Ok(Vector2::new(
            metrics.widthIncludingTrailingWhitespace,
            metrics.height,
        ))
    }
}
