use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollOffset {
    pub x: f32,
    pub y: f32,
}

impl ScrollOffset {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Scroll containers never scroll before their origin.
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.max(0.0),
            y: self.y.max(0.0),
        }
    }

    /// Keeps the offset between the origin and `limit` on both axes.
    pub fn bounded_by(self, limit: ScrollOffset) -> Self {
        Self {
            x: self.x.clamp(0.0, limit.x.max(0.0)),
            y: self.y.clamp(0.0, limit.y.max(0.0)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerPosition {
    pub x: f32,
    pub y: f32,
}

impl PointerPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Auxiliary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragOrigin {
    pointer: PointerPosition,
    scroll: ScrollOffset,
}

/// Bounded scale factor plus the middle-button drag-to-scroll gesture.
#[derive(Debug, Clone)]
pub struct ZoomPan {
    scale: f32,
    min_scale: f32,
    max_scale: f32,
    step: f32,
    drag_multiplier: f32,
    drag: Option<DragOrigin>,
}

impl ZoomPan {
    pub fn new(scale: f32, min_scale: f32, max_scale: f32, step: f32, drag_multiplier: f32) -> Self {
        Self {
            scale: scale.clamp(min_scale, max_scale),
            min_scale,
            max_scale,
            step,
            drag_multiplier,
            drag: None,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Returns `true` when the scale changed.
    pub fn zoom_by(&mut self, delta: f32) -> bool {
        self.set_scale(self.scale + delta)
    }

    pub fn set_scale(&mut self, scale: f32) -> bool {
        if !scale.is_finite() {
            return false;
        }
        // Accumulated steps drift; the bounds themselves must be reachable.
        let next = scale.clamp(self.min_scale, self.max_scale);
        if next == self.scale {
            return false;
        }
        self.scale = next;
        true
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Starts a pan on an auxiliary press over a pannable surface. A press
    /// while a pan is active is ignored.
    pub fn press(
        &mut self,
        button: PointerButton,
        pointer: PointerPosition,
        scroll: ScrollOffset,
        pannable: bool,
    ) -> bool {
        if button != PointerButton::Auxiliary || !pannable {
            return false;
        }
        if self.drag.is_some() {
            trace!("press ignored during active pan");
            return false;
        }
        self.drag = Some(DragOrigin { pointer, scroll });
        true
    }

    /// Scroll offset the container should adopt for this pointer position.
    pub fn drag_to(&self, pointer: PointerPosition) -> Option<ScrollOffset> {
        let origin = self.drag?;
        let walk_x = (pointer.x - origin.pointer.x) * self.drag_multiplier;
        let walk_y = (pointer.y - origin.pointer.y) * self.drag_multiplier;
        Some(ScrollOffset::new(origin.scroll.x - walk_x, origin.scroll.y - walk_y).clamped())
    }

    pub fn release(&mut self) -> bool {
        self.drag.take().is_some()
    }
}
