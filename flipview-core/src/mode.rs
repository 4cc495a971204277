use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Presentation mode chosen by the user or by the responsive policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    Single,
    Scroll,
    Book,
}

impl ViewMode {
    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Single => "single",
            ViewMode::Scroll => "scroll",
            ViewMode::Book => "book",
        }
    }
}

/// Coarse device-width bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewportClass {
    Mobile,
    Desktop,
}

impl ViewportClass {
    pub fn from_width(width: u32, breakpoint: u32) -> Self {
        if width < breakpoint {
            ViewportClass::Mobile
        } else {
            ViewportClass::Desktop
        }
    }
}

/// Render surface actually shown. Book needs a desktop viewport and mobile
/// viewports always stack pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    Single,
    Scroll,
    Book,
}

impl Layout {
    pub fn resolve(mode: ViewMode, viewport: ViewportClass) -> Self {
        match (mode, viewport) {
            (ViewMode::Book, ViewportClass::Desktop) => Layout::Book,
            (ViewMode::Scroll, _) | (_, ViewportClass::Mobile) => Layout::Scroll,
            (ViewMode::Single, ViewportClass::Desktop) => Layout::Single,
        }
    }

    /// Whether the layout has a native scrollable container to pan.
    pub fn is_pannable(self) -> bool {
        !matches!(self, Layout::Book)
    }
}

/// Mode and scale imposed when the viewport class changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponsiveReset {
    pub mode: ViewMode,
    pub scale: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSwitch {
    Accepted { from: ViewMode, to: ViewMode },
    Unchanged,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct ModeController {
    mode: ViewMode,
    viewport: ViewportClass,
    mobile_scale: f32,
    desktop_scale: f32,
}

impl ModeController {
    pub fn new(viewport: ViewportClass, mobile_scale: f32, desktop_scale: f32) -> Self {
        let mut controller = Self {
            mode: ViewMode::Book,
            viewport,
            mobile_scale,
            desktop_scale,
        };
        controller.mode = controller.defaults_for(viewport).mode;
        controller
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn viewport(&self) -> ViewportClass {
        self.viewport
    }

    pub fn layout(&self) -> Layout {
        Layout::resolve(self.mode, self.viewport)
    }

    pub fn defaults_for(&self, viewport: ViewportClass) -> ResponsiveReset {
        match viewport {
            ViewportClass::Mobile => ResponsiveReset {
                mode: ViewMode::Scroll,
                scale: self.mobile_scale,
            },
            ViewportClass::Desktop => ResponsiveReset {
                mode: ViewMode::Book,
                scale: self.desktop_scale,
            },
        }
    }

    /// Applies the responsive defaults only when the class actually changes.
    pub fn set_viewport_class(&mut self, viewport: ViewportClass) -> Option<ResponsiveReset> {
        if viewport == self.viewport {
            trace!(?viewport, "viewport class unchanged");
            return None;
        }
        let reset = self.defaults_for(viewport);
        debug!(from = ?self.viewport, to = ?viewport, mode = ?reset.mode, "responsive reset");
        self.viewport = viewport;
        self.mode = reset.mode;
        Some(reset)
    }

    pub fn set_mode(&mut self, mode: ViewMode) -> ModeSwitch {
        if mode == ViewMode::Book && self.viewport == ViewportClass::Mobile {
            trace!("book mode rejected on mobile viewport");
            return ModeSwitch::Rejected;
        }
        if mode == self.mode {
            return ModeSwitch::Unchanged;
        }
        let from = self.mode;
        self.mode = mode;
        debug!(?from, to = ?mode, "mode switched");
        ModeSwitch::Accepted { from, to: mode }
    }
}
