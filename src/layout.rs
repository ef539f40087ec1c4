/*
 * Positioning strategies a container applies to its children right before
 * recursing into them during `update`. Strategies carry no state; a container
 * just stores which one it uses.
 */
use crate::controls::{ContainerFrame, ControlBase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Children keep whatever geometry was assigned to them.
    None,
    /// Visible children are stacked top to bottom.
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy)]
struct StackCursor {
    x: f32,
    y: f32,
    height: f32,
    margin_bottom: f32,
}

impl Layout {
    pub fn apply<'a, I>(self, container: &ContainerFrame, children: I)
    where
        I: IntoIterator<Item = &'a mut ControlBase>,
    {
        match self {
            Layout::None => {}
            Layout::Linear => apply_linear(container, children),
        }
    }
}

/*
 * Stacks visible children in index order. The first visible child sits at the
 * container's inner left edge and its own top margin; every following visible
 * child reuses the previous child's X and starts below its bottom edge plus
 * both adjoining margins. Invisible children neither occupy space nor move the
 * cursor.
 */
fn apply_linear<'a, I>(container: &ContainerFrame, children: I)
where
    I: IntoIterator<Item = &'a mut ControlBase>,
{
    let inner_width = container.width - container.margins.left - container.margins.right;
    let mut previous: Option<StackCursor> = None;

    for child in children {
        if !child.visible {
            continue;
        }

        if child.fill_parent {
            child.width = inner_width - child.margins.left - child.margins.right;
        }

        match previous {
            None => {
                child.x = child.margins.left + container.margins.left;
                child.y = child.margins.top;
            }
            Some(prev) => {
                child.x = prev.x;
                child.y = prev.y + prev.height + prev.margin_bottom + child.margins.top;
            }
        }

        previous = Some(StackCursor {
            x: child.x,
            y: child.y,
            height: child.height,
            margin_bottom: child.margins.bottom,
        });
    }
}
