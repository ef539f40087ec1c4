/*
 * Thin horizontal separator between the controls of a container.
 */
use super::{Control, ControlBase, UpdateFrame};
use crate::error::Result as PlatformResult;
use crate::renderer::RenderSurface;
use crate::types::Vector2;

pub const SPACER_HEIGHT: f32 = 2.0;

pub struct Spacer {
    base: ControlBase,
}

impl Default for Spacer {
    fn default() -> Self {
        Self::new()
    }
}

impl Spacer {
    pub fn new() -> Self {
        let mut base = ControlBase::new();
        base.height = SPACER_HEIGHT;
        base.fill_parent = true;
        Self { base }
    }
}

impl Control for Spacer {
    fn base(&self) -> &ControlBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ControlBase {
        &mut self.base
    }

    fn update(&mut self, frame: &UpdateFrame<'_>) {
        let parent = frame.parent;
        self.base.width =
            parent.width - self.base.margins.horizontal() - parent.margins.horizontal();
        self.base.update_children(frame);
    }

    fn draw(&mut self, surface: &mut dyn RenderSurface, origin: Vector2) -> PlatformResult<()> {
        surface.fill_rectangle(
            self.base.fore_color,
            self.base.absolute_location(origin),
            self.base.size(),
        )?;
        self.base.draw_children(surface, origin)
    }
}
