/*
 * Clickable text box. Pointer events come from `ControlBase::poll_mouse`; a
 * click is reported when a button is released over the control. Subscribers
 * are plain closures invoked synchronously during `update`.
 */
use super::{Control, ControlBase, MouseEvent, UpdateFrame};
use crate::error::Result as PlatformResult;
use crate::input::MouseButton;
use crate::renderer::RenderSurface;
use crate::types::Vector2;

type MouseHandler = Box<dyn FnMut(MouseButton)>;

const TEXT_PADDING: f32 = 4.0;
const HOVER_LIGHTEN: u8 = 40;

pub struct Button {
    base: ControlBase,
    pub auto_size: bool,
    click_handlers: Vec<MouseHandler>,
    down_handlers: Vec<MouseHandler>,
}

impl Default for Button {
    fn default() -> Self {
        Self::new("")
    }
}

impl Button {
    pub fn new(text: &str) -> Self {
        let mut base = ControlBase::new();
        base.text = text.to_string();
        base.height = 20.0;
        Self {
            base,
            auto_size: true,
            click_handlers: Vec::new(),
            down_handlers: Vec::new(),
        }
    }

    /// Called with the mouse button that was released over the control.
    pub fn on_click(&mut self, handler: impl FnMut(MouseButton) + 'static) {
        self.click_handlers.push(Box::new(handler));
    }

    pub fn on_mouse_down(&mut self, handler: impl FnMut(MouseButton) + 'static) {
        self.down_handlers.push(Box::new(handler));
    }

    /*
     * Polls the pointer, fires subscribers and returns the events so wrapping
     * controls (e.g. `KeyButton`) can react to them as well.
     */
    pub(crate) fn process_mouse(&mut self, frame: &UpdateFrame<'_>) -> Vec<MouseEvent> {
        let events = self.base.poll_mouse(frame);
        for event in &events {
            match *event {
                MouseEvent::Down { button, .. } => {
                    for handler in self.down_handlers.iter_mut() {
                        handler(button);
                    }
                }
                MouseEvent::Up { button, .. } => {
                    log::trace!("Button '{}': click with {button:?}", self.base.text);
                    for handler in self.click_handlers.iter_mut() {
                        handler(button);
                    }
                }
                _ => {}
            }
        }
        events
    }

    pub(crate) fn draw_with_text(
        &mut self,
        surface: &mut dyn RenderSurface,
        origin: Vector2,
        text: &str,
    ) -> PlatformResult<()> {
        let text_size = surface.measure_string(text, &self.base.font)?;
        if self.auto_size {
            self.base.height = text_size.y + TEXT_PADDING * 2.0;
            if !self.base.fill_parent {
                self.base.width = text_size.x + TEXT_PADDING * 2.0;
            }
        }

        let location = self.base.absolute_location(origin);
        let fill = if self.base.is_mouse_over() {
            self.base.back_color.lighten(HOVER_LIGHTEN)
        } else {
            self.base.back_color
        };
        surface.fill_rectangle(fill, location, self.base.size())?;
        surface.draw_rectangle(self.base.fore_color, location, self.base.size(), 1.0)?;

        let text_location = Vector2::new(
            location.x + ((self.base.width - text_size.x) / 2.0).max(TEXT_PADDING),
            location.y + (self.base.height - text_size.y) / 2.0,
        );
        surface.draw_text(text, self.base.fore_color, &self.base.font, text_location)?;
        self.base.draw_children(surface, origin)
    }
}

impl Control for Button {
    fn base(&self) -> &ControlBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ControlBase {
        &mut self.base
    }

    fn update(&mut self, frame: &UpdateFrame<'_>) {
        self.process_mouse(frame);
        self.base.update_children(frame);
    }

    fn draw(&mut self, surface: &mut dyn RenderSurface, origin: Vector2) -> PlatformResult<()> {
        let text = self.base.text.clone();
        self.draw_with_text(surface, origin, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::ContainerFrame;
    use crate::input::{InputSnapshot, InputTracker, VirtualKey};
    use crate::testing::{RecordingSurface, SurfaceCall};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn frame_at<'a>(input: &'a InputSnapshot, cursor: Vector2) -> UpdateFrame<'a> {
        UpdateFrame {
            seconds_elapsed: 0.01,
            input,
            cursor,
            check_mouse: true,
            parent: ContainerFrame::root(500.0, 500.0),
        }
    }

    #[test]
    fn release_over_button_fires_click_handlers() {
        let clicks = Rc::new(RefCell::new(Vec::new()));
        let mut button = Button::new("Go");
        button.base_mut().width = 50.0;
        button.base_mut().height = 20.0;
        let sink = Rc::clone(&clicks);
        button.on_click(move |b| sink.borrow_mut().push(b));

        let mut tracker = InputTracker::new();
        let keys = [VirtualKey::LBUTTON, VirtualKey::RBUTTON];
        let inside = Vector2::new(10.0, 10.0);

        let down = tracker.sample(keys, |k| k == VirtualKey::RBUTTON, inside);
        button.update(&frame_at(&down, inside));
        assert!(clicks.borrow().is_empty());

        let up = tracker.sample(keys, |_| false, inside);
        button.update(&frame_at(&up, inside));
        assert_eq!(*clicks.borrow(), vec![MouseButton::Right]);
    }

    #[test]
    fn release_outside_does_not_click() {
        let clicks = Rc::new(RefCell::new(0));
        let mut button = Button::new("Go");
        button.base_mut().width = 50.0;
        let sink = Rc::clone(&clicks);
        button.on_click(move |_| *sink.borrow_mut() += 1);

        let mut tracker = InputTracker::new();
        let keys = [VirtualKey::LBUTTON];
        tracker.sample(keys, |_| true, Vector2::ZERO);
        let up = tracker.sample(keys, |_| false, Vector2::ZERO);
        button.update(&frame_at(&up, Vector2::new(300.0, 300.0)));

        assert_eq!(*clicks.borrow(), 0);
    }

    #[test]
    fn auto_size_pads_measured_text() {
        let mut button = Button::new("OK");
        let mut surface = RecordingSurface::default();
        button.draw(&mut surface, Vector2::ZERO).unwrap();

        // "OK" measures 12x12 on the recording surface
        assert_eq!(button.base().size(), Vector2::new(20.0, 20.0));
        assert!(matches!(surface.calls[0], SurfaceCall::FillRectangle { .. }));
        assert!(matches!(surface.calls[1], SurfaceCall::DrawRectangle { .. }));
        assert_eq!(
            surface.calls[2],
            SurfaceCall::DrawText {
                text: "OK".into(),
                position: Vector2::new(4.0, 4.0),
            }
        );
    }
}
