/*
 * Single line of text. With `auto_size` the label adopts the measured text
 * extent every time it is drawn, so the next layout pass stacks it correctly.
 */
use super::{Control, ControlBase};
use crate::error::Result as PlatformResult;
use crate::renderer::RenderSurface;
use crate::types::Vector2;

pub struct Label {
    base: ControlBase,
    pub auto_size: bool,
    pub draw_background: bool,
}

impl Default for Label {
    fn default() -> Self {
        Self::new("")
    }
}

impl Label {
    pub fn new(text: &str) -> Self {
        let mut base = ControlBase::new();
        base.text = text.to_string();
        Self {
            base,
            auto_size: true,
            draw_background: false,
        }
    }
}

impl Control for Label {
    fn base(&self) -> &ControlBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ControlBase {
        &mut self.base
    }

    fn draw(&mut self, surface: &mut dyn RenderSurface, origin: Vector2) -> PlatformResult<()> {
        if self.auto_size {
            let measured = surface.measure_string(&self.base.text, &self.base.font)?;
            self.base.width = measured.x;
            self.base.height = measured.y;
        }
        let location = self.base.absolute_location(origin);
        if self.draw_background {
            surface.fill_rectangle(self.base.back_color, location, self.base.size())?;
        }
        surface.draw_text(&self.base.text, self.base.fore_color, &self.base.font, location)?;
        self.base.draw_children(surface, origin)
    }
}
