/*
 * Retained-mode control tree. Every node implements `Control`; containers own
 * their children as `Vec<Box<dyn Control>>` and drive them through the same
 * two-operation contract:
 *
 * - `update` runs for every child, visible or not, after the container has
 *   computed its own state and applied its layout.
 * - `draw` skips invisible children.
 *
 * A child never holds a pointer to its parent. The parent's geometry reaches
 * it as the `ContainerFrame` inside `UpdateFrame`, and the parent's absolute
 * location is the `origin` passed to `draw`.
 */
pub mod button;
pub mod key_button;
pub mod label;
pub mod panel;
pub mod spacer;
pub mod window;

pub use button::Button;
pub use key_button::KeyButton;
pub use label::Label;
pub use panel::Panel;
pub use spacer::Spacer;
pub use window::Window;

use crate::config::Settings;
use crate::error::Result as PlatformResult;
use crate::input::{InputSnapshot, MouseButton};
use crate::layout::Layout;
use crate::renderer::RenderSurface;
use crate::types::{Color, Margins, Vector2};

pub const DEFAULT_FONT: &str = "default";

/// Geometry of the container whose children are being laid out or updated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerFrame {
    /// Absolute location of the container.
    pub origin: Vector2,
    pub width: f32,
    pub height: f32,
    pub margins: Margins,
}

impl ContainerFrame {
    pub fn root(width: f32, height: f32) -> Self {
        Self {
            origin: Vector2::ZERO,
            width,
            height,
            margins: Margins::default(),
        }
    }
}

/// Everything a control sees during one logic frame.
#[derive(Debug, Clone, Copy)]
pub struct UpdateFrame<'a> {
    pub seconds_elapsed: f64,
    pub input: &'a InputSnapshot,
    /// Cursor position in overlay client coordinates.
    pub cursor: Vector2,
    /// Only the foreground overlay sets this; pointer interaction is ignored otherwise.
    pub check_mouse: bool,
    pub parent: ContainerFrame,
}

impl<'a> UpdateFrame<'a> {
    /// Frame handed to the children of `container`.
    pub fn for_children_of(&self, container: &ControlBase) -> UpdateFrame<'a> {
        UpdateFrame {
            parent: container.as_container(self.parent.origin),
            ..*self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MouseEvent {
    Entered,
    Left,
    Moved { position: Vector2, previous: Vector2 },
    Down { button: MouseButton, position: Vector2 },
    Up { button: MouseButton, position: Vector2 },
}

#[derive(Debug, Clone, Copy, Default)]
struct MouseTracking {
    over: bool,
    last_position: Vector2,
}

/// State every control shares: geometry, visibility, appearance and children.
pub struct ControlBase {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub margins: Margins,
    pub visible: bool,
    /// Stretch to the parent's inner width during layout.
    pub fill_parent: bool,
    pub text: String,
    pub font: String,
    pub fore_color: Color,
    pub back_color: Color,
    /// Settings key this control reads its persisted value from.
    pub tag: Option<String>,
    pub layout: Layout,
    children: Vec<Box<dyn Control>>,
    mouse: MouseTracking,
}

impl Default for ControlBase {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlBase {
    pub fn new() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            margins: Margins::default(),
            visible: true,
            fill_parent: false,
            text: String::new(),
            font: DEFAULT_FONT.to_string(),
            fore_color: Color::WHITE,
            back_color: Color::rgba(30, 30, 30, 200),
            tag: None,
            layout: Layout::None,
            children: Vec::new(),
            mouse: MouseTracking::default(),
        }
    }

    pub fn location(&self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }

    pub fn size(&self) -> Vector2 {
        Vector2::new(self.width, self.height)
    }

    /// `origin` is the parent's absolute location.
    pub fn absolute_location(&self, origin: Vector2) -> Vector2 {
        origin + self.location()
    }

    pub fn contains(&self, point: Vector2, origin: Vector2) -> bool {
        let top_left = self.absolute_location(origin);
        point.x >= top_left.x
            && point.y >= top_left.y
            && point.x <= top_left.x + self.width
            && point.y <= top_left.y + self.height
    }

    pub fn as_container(&self, origin: Vector2) -> ContainerFrame {
        ContainerFrame {
            origin: self.absolute_location(origin),
            width: self.width,
            height: self.height,
            margins: self.margins,
        }
    }

    pub fn is_mouse_over(&self) -> bool {
        self.mouse.over
    }

    pub fn last_mouse_position(&self) -> Vector2 {
        self.mouse.last_position
    }

    pub fn add_child(&mut self, child: Box<dyn Control>) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[Box<dyn Control>] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Box<dyn Control>] {
        &mut self.children
    }

    /// Bottom edge of the lowest visible child, including its bottom margin.
    pub fn content_bottom(&self) -> f32 {
        self.children
            .iter()
            .map(|c| c.base())
            .filter(|c| c.visible)
            .map(|c| c.y + c.height + c.margins.bottom)
            .fold(0.0, f32::max)
    }

    /*
     * Applies the layout to the children and then updates each of them in
     * list order. Invisible children are updated too.
     */
    pub fn update_children(&mut self, frame: &UpdateFrame<'_>) {
        let child_frame = frame.for_children_of(self);
        self.layout.apply(
            &child_frame.parent,
            self.children.iter_mut().map(|c| c.base_mut()),
        );
        for child in self.children.iter_mut() {
            child.update(&child_frame);
        }
    }

    pub fn draw_children(
        &mut self,
        surface: &mut dyn RenderSurface,
        origin: Vector2,
    ) -> PlatformResult<()> {
        let location = self.absolute_location(origin);
        for child in self.children.iter_mut() {
            if child.base().visible {
                child.draw(surface, location)?;
            }
        }
        Ok(())
    }

    pub fn apply_settings_to_children(&mut self, settings: &Settings) {
        for child in self.children.iter_mut() {
            child.apply_settings(settings);
        }
    }

    /*
     * Translates the frame's cursor and mouse-button transitions into events
     * for this control. Nothing is reported unless `check_mouse` is set.
     */
    pub fn poll_mouse(&mut self, frame: &UpdateFrame<'_>) -> Vec<MouseEvent> {
        let mut events = Vec::new();
        if !frame.check_mouse {
            return events;
        }

        let cursor = frame.cursor;
        let inside = self.contains(cursor, frame.parent.origin);
        match (self.mouse.over, inside) {
            (false, true) => events.push(MouseEvent::Entered),
            (true, false) => events.push(MouseEvent::Left),
            _ => {}
        }

        if inside {
            if cursor != self.mouse.last_position {
                events.push(MouseEvent::Moved {
                    position: cursor,
                    previous: self.mouse.last_position,
                });
            }
            for button in frame.input.mouse_went_down() {
                events.push(MouseEvent::Down {
                    button,
                    position: cursor,
                });
            }
            for button in frame.input.mouse_went_up() {
                events.push(MouseEvent::Up {
                    button,
                    position: cursor,
                });
            }
        }

        self.mouse.over = inside;
        self.mouse.last_position = cursor;
        events
    }
}

pub trait Control {
    fn base(&self) -> &ControlBase;
    fn base_mut(&mut self) -> &mut ControlBase;

    fn update(&mut self, frame: &UpdateFrame<'_>) {
        self.base_mut().update_children(frame);
    }

    /// `origin` is the parent's absolute location.
    fn draw(&mut self, surface: &mut dyn RenderSurface, origin: Vector2) -> PlatformResult<()> {
        self.base_mut().draw_children(surface, origin)
    }

    fn apply_settings(&mut self, settings: &Settings) {
        self.base_mut().apply_settings_to_children(settings);
    }
}
