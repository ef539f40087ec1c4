/*
 * Button that captures a key binding. A left click puts it into listening
 * mode; after a short grace period (so the click's own release is not
 * captured) the next released key becomes the bound key. The bound key can be
 * restored from `Settings` under the control's tag.
 */
use super::{Button, Control, ControlBase, MouseEvent, UpdateFrame};
use crate::config::Settings;
use crate::error::Result as PlatformResult;
use crate::input::{MouseButton, VirtualKey};
use crate::renderer::RenderSurface;
use crate::types::Vector2;

/// Frames ignored after the click before key releases are captured.
pub const LISTEN_SKIP_FRAMES: u32 = 10;

type KeyChangedHandler = Box<dyn FnMut(VirtualKey)>;

pub struct KeyButton {
    button: Button,
    key: VirtualKey,
    listening: bool,
    skip: u32,
    key_changed_handlers: Vec<KeyChangedHandler>,
}

impl Default for KeyButton {
    fn default() -> Self {
        Self::new("")
    }
}

impl KeyButton {
    pub fn new(text: &str) -> Self {
        Self {
            button: Button::new(text),
            key: VirtualKey::XBUTTON1,
            listening: false,
            skip: 0,
            key_changed_handlers: Vec::new(),
        }
    }

    pub fn key(&self) -> VirtualKey {
        self.key
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Assigns the key; subscribers are notified only when it actually changes.
    pub fn set_key(&mut self, key: VirtualKey) {
        if self.key != key {
            self.key = key;
            log::debug!("KeyButton '{}': bound to {key}", self.button.base().text);
            for handler in self.key_changed_handlers.iter_mut() {
                handler(key);
            }
        }
    }

    pub fn on_key_changed(&mut self, handler: impl FnMut(VirtualKey) + 'static) {
        self.key_changed_handlers.push(Box::new(handler));
    }

    pub fn display_text(&self) -> String {
        let text = &self.button.base().text;
        if self.listening {
            format!("{text} <press key>")
        } else {
            format!("{text} {}", self.key)
        }
    }
}

impl Control for KeyButton {
    fn base(&self) -> &ControlBase {
        self.button.base()
    }

    fn base_mut(&mut self) -> &mut ControlBase {
        self.button.base_mut()
    }

    fn update(&mut self, frame: &UpdateFrame<'_>) {
        let events = self.button.process_mouse(frame);
        self.button.base_mut().update_children(frame);

        let left_released = events.iter().any(|e| {
            matches!(
                e,
                MouseEvent::Up {
                    button: MouseButton::Left,
                    ..
                }
            )
        });
        if left_released {
            self.listening = true;
            self.skip = LISTEN_SKIP_FRAMES;
            return;
        }

        if self.listening {
            if self.skip > 0 {
                self.skip -= 1;
                return;
            }
            if let Some(&key) = frame.input.keys_that_went_up().first() {
                self.listening = false;
                self.set_key(key);
            }
        }
    }

    fn draw(&mut self, surface: &mut dyn RenderSurface, origin: Vector2) -> PlatformResult<()> {
        let text = self.display_text();
        self.button.draw_with_text(surface, origin, &text)
    }

    fn apply_settings(&mut self, settings: &Settings) {
        if let Some(tag) = self.button.base().tag.clone()
            && settings.has_key(&tag)
        {
            match settings.get_value::<VirtualKey>(&tag) {
                Ok(key) => self.set_key(key),
                Err(e) => log::warn!("KeyButton: ignoring setting '{tag}': {e}"),
            }
        }
        self.button.base_mut().apply_settings_to_children(settings);
    }
}
