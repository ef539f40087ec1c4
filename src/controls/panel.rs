/*
 * Generic container. Stacks its children with `Layout::Linear` unless told
 * otherwise and can grow its height to fit them.
 */
use super::{Control, ControlBase, UpdateFrame};
use crate::error::Result as PlatformResult;
use crate::layout::Layout;
use crate::renderer::RenderSurface;
use crate::types::Vector2;

pub struct Panel {
    base: ControlBase,
    pub draw_background: bool,
    pub draw_border: bool,
    /// Height follows the lowest visible child after every update.
    pub dynamic_height: bool,
}

impl Default for Panel {
    fn default() -> Self {
        Self::new()
    }
}

impl Panel {
    pub fn new() -> Self {
        let mut base = ControlBase::new();
        base.layout = Layout::Linear;
        Self {
            base,
            draw_background: true,
            draw_border: true,
            dynamic_height: true,
        }
    }

    pub fn add_child(&mut self, child: Box<dyn Control>) {
        self.base.add_child(child);
    }
}

impl Control for Panel {
    fn base(&self) -> &ControlBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ControlBase {
        &mut self.base
    }

    fn update(&mut self, frame: &UpdateFrame<'_>) {
        self.base.update_children(frame);
        if self.dynamic_height {
            self.base.height = self.base.content_bottom();
        }
    }

    fn draw(&mut self, surface: &mut dyn RenderSurface, origin: Vector2) -> PlatformResult<()> {
        let location = self.base.absolute_location(origin);
        if self.draw_background {
            surface.fill_rectangle(self.base.back_color, location, self.base.size())?;
        }
        if self.draw_border {
            surface.draw_rectangle(self.base.fore_color, location, self.base.size(), 1.0)?;
        }
        self.base.draw_children(surface, origin)
    }
}
