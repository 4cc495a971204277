use std::ops::RangeInclusive;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ViewerConfig;
use crate::document::RenderRequest;
use crate::mode::{Layout, ViewportClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Dark theme shows page imagery with inverted tone.
    pub fn inverts_pages(self) -> bool {
        matches!(self, Theme::Dark)
    }
}

/// Element id hosts use to address a page in the stacked layout.
pub fn page_element_id(page_number: usize) -> String {
    format!("pdf-page-{page_number}")
}

/// One page the surface wants rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSlot {
    pub page_number: usize,
    pub element_id: String,
    pub width_hint: u32,
    pub scale: f32,
    pub invert: bool,
}

impl PageSlot {
    fn new(page_number: usize, width_hint: u32, scale: f32, theme: Theme) -> Self {
        Self {
            page_number,
            element_id: page_element_id(page_number),
            width_hint,
            scale,
            invert: theme.inverts_pages(),
        }
    }

    pub fn request(&self) -> RenderRequest {
        RenderRequest {
            page_number: self.page_number,
            width_hint: self.width_hint,
            scale: self.scale,
            dark_mode: self.invert,
        }
    }
}

/// Vertical placement of stacked pages, in unscaled pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub gap: f32,
    pub page_count: usize,
}

impl StackGeometry {
    fn stride(&self) -> f32 {
        self.page_height + self.gap
    }

    /// Offset of the top edge of a one-based page.
    pub fn page_top(&self, page_number: usize) -> f32 {
        page_number.saturating_sub(1) as f32 * self.stride()
    }

    pub fn content_height(&self) -> f32 {
        if self.page_count == 0 {
            return 0.0;
        }
        self.page_count as f32 * self.stride() - self.gap
    }

    /// One-based pages intersecting `[offset, offset + viewport_height)`.
    pub fn visible_pages(&self, offset: f32, viewport_height: f32) -> Option<RangeInclusive<usize>> {
        if self.page_count == 0 || viewport_height <= 0.0 || self.stride() <= 0.0 {
            return None;
        }
        let offset = offset.max(0.0);
        let first = (offset / self.stride()).floor() as usize + 1;
        if first > self.page_count {
            return None;
        }
        let bottom = offset + viewport_height;
        let last = ((bottom / self.stride()).ceil() as usize).clamp(first, self.page_count);
        Some(first..=last)
    }
}

/// What the host draws for the current state.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderSurface {
    /// Page count unknown. `failed` is set once the document load gave up.
    Loading { failed: bool },
    Single {
        slot: PageSlot,
        fade: Duration,
    },
    Scroll {
        slots: Vec<PageSlot>,
        geometry: StackGeometry,
    },
    Book {
        /// Zero-based index handed to the flip engine for the tracked page.
        index: usize,
        page_width: u32,
        page_height: u32,
        show_cover: bool,
        slots: Vec<PageSlot>,
    },
}

pub(crate) struct SurfaceInputs<'a> {
    pub config: &'a ViewerConfig,
    pub layout: Layout,
    pub viewport: ViewportClass,
    pub theme: Theme,
    pub scale: f32,
    pub current_page: usize,
    pub total_pages: usize,
    pub failed: bool,
}

impl RenderSurface {
    pub(crate) fn build(inputs: SurfaceInputs<'_>) -> Self {
        let SurfaceInputs {
            config,
            layout,
            viewport,
            theme,
            scale,
            current_page,
            total_pages,
            failed,
        } = inputs;

        if total_pages == 0 {
            return RenderSurface::Loading { failed };
        }

        match layout {
            Layout::Single => RenderSurface::Single {
                slot: PageSlot::new(current_page, config.page_width, scale, theme),
                fade: Duration::from_millis(config.fade_millis),
            },
            Layout::Scroll => {
                let width = scroll_width(config, viewport);
                let slots = (1..=total_pages)
                    .map(|page| PageSlot::new(page, width, scale, theme))
                    .collect();
                RenderSurface::Scroll {
                    slots,
                    geometry: stack_geometry(config, viewport, total_pages),
                }
            }
            Layout::Book => RenderSurface::Book {
                index: current_page - 1,
                page_width: config.page_width,
                page_height: config.page_height,
                show_cover: config.show_cover,
                slots: (1..=total_pages)
                    .map(|page| PageSlot::new(page, config.page_width, scale, theme))
                    .collect(),
            },
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, RenderSurface::Loading { .. })
    }

    pub fn slots(&self) -> &[PageSlot] {
        match self {
            RenderSurface::Loading { .. } => &[],
            RenderSurface::Single { slot, .. } => std::slice::from_ref(slot),
            RenderSurface::Scroll { slots, .. } | RenderSurface::Book { slots, .. } => slots,
        }
    }

    pub fn slot(&self, page_number: usize) -> Option<&PageSlot> {
        self.slots().iter().find(|slot| slot.page_number == page_number)
    }
}

pub(crate) fn stack_geometry(
    config: &ViewerConfig,
    viewport: ViewportClass,
    page_count: usize,
) -> StackGeometry {
    let width = scroll_width(config, viewport) as f32;
    StackGeometry {
        page_width: width,
        page_height: config.page_height_for_width(width),
        gap: config.page_gap as f32,
        page_count,
    }
}

fn scroll_width(config: &ViewerConfig, viewport: ViewportClass) -> u32 {
    match viewport {
        ViewportClass::Mobile => config.mobile_scroll_width,
        ViewportClass::Desktop => {
            (config.page_width as f32 * config.scroll_width_ratio).round() as u32
        }
    }
}
