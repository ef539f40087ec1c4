/*
 * Movable window: a framed container with a caption label, a separator and a
 * content panel underneath. Holding the left mouse button over it drags it.
 * Children added through `add_child` go into the content panel.
 */
use super::{Control, ControlBase, Label, MouseEvent, Panel, UpdateFrame};
use crate::config::Settings;
use crate::error::Result as PlatformResult;
use crate::input::MouseButton;
use crate::layout::Layout;
use crate::renderer::RenderSurface;
use crate::types::{Margins, Vector2};

const SEPARATOR_HEIGHT: f32 = 2.0;

pub struct Window {
    base: ControlBase,
    caption: Label,
    content: Panel,
    dragging: bool,
}

impl Default for Window {
    fn default() -> Self {
        Self::new("")
    }
}

impl Window {
    pub fn new(title: &str) -> Self {
        let mut base = ControlBase::new();
        base.text = title.to_string();
        base.width = 200.0;
        base.margins = Margins::uniform(4.0);
        base.layout = Layout::Linear;

        let mut caption = Label::new(title);
        caption.base_mut().margins = Margins {
            bottom: SEPARATOR_HEIGHT * 2.0,
            ..Margins::default()
        };

        let mut content = Panel::new();
        content.draw_background = false;
        content.draw_border = false;
        content.base_mut().fill_parent = true;

        Self {
            base,
            caption,
            content,
            dragging: false,
        }
    }

    pub fn set_title(&mut self, title: &str) {
        self.base.text = title.to_string();
    }

    pub fn caption(&self) -> &Label {
        &self.caption
    }

    pub fn content(&self) -> &Panel {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut Panel {
        &mut self.content
    }

    pub fn add_child(&mut self, child: Box<dyn Control>) {
        self.content.add_child(child);
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    fn handle_mouse(&mut self, events: &[MouseEvent]) {
        for event in events {
            match *event {
                MouseEvent::Down {
                    button: MouseButton::Left,
                    ..
                } => self.dragging = true,
                MouseEvent::Up {
                    button: MouseButton::Left,
                    ..
                }
                | MouseEvent::Left => self.dragging = false,
                MouseEvent::Moved { position, previous } if self.dragging => {
                    self.base.x += position.x - previous.x;
                    self.base.y += position.y - previous.y;
                }
                _ => {}
            }
        }
    }
}

impl Control for Window {
    fn base(&self) -> &ControlBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ControlBase {
        &mut self.base
    }

    fn update(&mut self, frame: &UpdateFrame<'_>) {
        let events = self.base.poll_mouse(frame);
        self.handle_mouse(&events);

        if self.caption.base().text != self.base.text {
            self.caption.base_mut().text = self.base.text.clone();
        }
        self.caption.base_mut().font = self.base.font.clone();

        let child_frame = frame.for_children_of(&self.base);
        self.base.layout.apply(
            &child_frame.parent,
            [self.caption.base_mut(), self.content.base_mut()],
        );
        self.caption.update(&child_frame);
        self.content.update(&child_frame);
        self.base.update_children(frame);

        let content = self.content.base();
        self.base.height = content.y + content.height + self.base.margins.bottom;
    }

    fn draw(&mut self, surface: &mut dyn RenderSurface, origin: Vector2) -> PlatformResult<()> {
        let location = self.base.absolute_location(origin);
        surface.fill_rectangle(self.base.back_color, location, self.base.size())?;
        surface.draw_rectangle(self.base.fore_color, location, self.base.size(), 1.0)?;

        self.caption.draw(surface, location)?;
        let caption = self.caption.base();
        let separator_location = Vector2::new(
            location.x,
            location.y + caption.y + caption.height + SEPARATOR_HEIGHT / 2.0,
        );
        surface.fill_rectangle(
            self.base.fore_color,
            separator_location,
            Vector2::new(self.base.width, SEPARATOR_HEIGHT),
        )?;

        if self.content.base().visible {
            self.content.draw(surface, location)?;
        }
        self.base.draw_children(surface, origin)
    }

    fn apply_settings(&mut self, settings: &Settings) {
        self.caption.apply_settings(settings);
        self.content.apply_settings(settings);
        self.base.apply_settings_to_children(settings);
    }
}
