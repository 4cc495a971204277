//! Page rendering for the viewer: a pdfium-backed [`DocumentSource`] and the
//! helpers hosts use to turn a [`RenderSurface`] into pixels.

use anyhow::{anyhow, Result};
use flipview_core::{
    DocumentSource, PageFault, PageSlot, RenderImage, RenderSurface, ViewerConfig,
};
use image::{imageops, Rgba, RgbaImage};
use rayon::prelude::*;
use tracing::warn;

#[cfg(feature = "pdf")]
mod pdf;

#[cfg(feature = "pdf")]
pub use pdf::{PdfiumDocumentProvider, PdfiumLibrary};

const PLACEHOLDER_FILL: [u8; 4] = [226, 232, 240, 255];
const PLACEHOLDER_EDGE: [u8; 4] = [148, 163, 184, 255];

/// Result of rendering one slot. A faulted page carries a placeholder image.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub page_number: usize,
    pub image: RenderImage,
    pub fault: Option<PageFault>,
}

impl RenderedPage {
    pub fn is_placeholder(&self) -> bool {
        self.fault.is_some()
    }
}

/// Renders `slots` in parallel. A failing page never affects its siblings.
pub fn render_slots(
    source: &dyn DocumentSource,
    slots: &[PageSlot],
    config: &ViewerConfig,
) -> Vec<RenderedPage> {
    slots
        .par_iter()
        .map(|slot| {
            let request = slot.request();
            match source.render_page(request) {
                Ok(image) => RenderedPage {
                    page_number: slot.page_number,
                    image,
                    fault: None,
                },
                Err(fault) => {
                    warn!(%fault, page = slot.page_number, "page render failed");
                    let width = request.target_width();
                    let height = config.page_height_for_width(width as f32).round() as u32;
                    RenderedPage {
                        page_number: slot.page_number,
                        image: placeholder(width, height.max(1), slot.invert),
                        fault: Some(fault),
                    }
                }
            }
        })
        .collect()
}

/// Renders the pages a surface shows right now: the current page, the visible
/// stretch of the stack, or the spread containing `spread` (zero-based).
pub fn render_visible(
    source: &dyn DocumentSource,
    surface: &RenderSurface,
    config: &ViewerConfig,
    scroll_y: f32,
    viewport_height: f32,
    spread: (usize, Option<usize>),
) -> Vec<RenderedPage> {
    let wanted: Vec<PageSlot> = match surface {
        RenderSurface::Loading { .. } => Vec::new(),
        RenderSurface::Single { slot, .. } => vec![slot.clone()],
        RenderSurface::Scroll { slots, geometry } => {
            let scale = slots.first().map(|slot| slot.scale).unwrap_or(1.0).max(f32::EPSILON);
            match geometry.visible_pages(scroll_y / scale, viewport_height / scale) {
                Some(range) => slots
                    .iter()
                    .filter(|slot| range.contains(&slot.page_number))
                    .cloned()
                    .collect(),
                None => Vec::new(),
            }
        }
        RenderSurface::Book { slots, .. } => {
            let (left, right) = spread;
            slots
                .iter()
                .filter(|slot| {
                    let index = slot.page_number - 1;
                    index == left || Some(index) == right
                })
                .cloned()
                .collect()
        }
    };
    render_slots(source, &wanted, config)
}

pub fn placeholder(width: u32, height: u32, dark: bool) -> RenderImage {
    let (fill, edge) = if dark {
        (invert(PLACEHOLDER_FILL), invert(PLACEHOLDER_EDGE))
    } else {
        (PLACEHOLDER_FILL, PLACEHOLDER_EDGE)
    };
    let mut canvas = RgbaImage::from_pixel(width.max(1), height.max(1), Rgba(fill));
    let (w, h) = canvas.dimensions();
    for x in 0..w {
        canvas.put_pixel(x, 0, Rgba(edge));
        canvas.put_pixel(x, h - 1, Rgba(edge));
    }
    for y in 0..h {
        canvas.put_pixel(0, y, Rgba(edge));
        canvas.put_pixel(w - 1, y, Rgba(edge));
    }
    into_render_image(canvas)
}

/// Places two facing pages side by side, vertically centred.
pub fn compose_spread(left: &RenderImage, right: Option<&RenderImage>) -> Result<RenderImage> {
    let left_img = to_rgba(left)?;
    let right_img = right.map(to_rgba).transpose()?;
    let right_width = right_img.as_ref().map(|img| img.width()).unwrap_or(0);
    let height = left_img
        .height()
        .max(right_img.as_ref().map(|img| img.height()).unwrap_or(0));

    let mut canvas = RgbaImage::from_pixel(left_img.width() + right_width, height, Rgba([0, 0, 0, 0]));
    imageops::overlay(
        &mut canvas,
        &left_img,
        0,
        i64::from((height - left_img.height()) / 2),
    );
    if let Some(right_img) = right_img {
        imageops::overlay(
            &mut canvas,
            &right_img,
            i64::from(left_img.width()),
            i64::from((height - right_img.height()) / 2),
        );
    }
    Ok(into_render_image(canvas))
}

/// Stacks pages top to bottom, horizontally centred. Every page gets a slot
/// of `slot_height` pixels followed by `gap`, so slot tops match the scroll
/// geometry whatever the real page heights are. Taller pages are cut at the
/// slot edge.
pub fn stack_vertical(pages: &[RenderImage], slot_height: u32, gap: u32) -> Result<RenderImage> {
    if pages.is_empty() {
        return Err(anyhow!("nothing to stack"));
    }
    let slot_height = slot_height.max(1);
    let images = pages.iter().map(to_rgba).collect::<Result<Vec<_>>>()?;
    let width = images.iter().map(|img| img.width()).max().unwrap_or(1);
    let count = images.len() as u32;
    let height = slot_height * count + gap * (count - 1);

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    for (slot, img) in (0u32..).zip(&images) {
        let visible =
            imageops::crop_imm(img, 0, 0, img.width(), img.height().min(slot_height)).to_image();
        imageops::overlay(
            &mut canvas,
            &visible,
            i64::from((width - img.width()) / 2),
            i64::from(slot * (slot_height + gap)),
        );
    }
    Ok(into_render_image(canvas))
}

/// Cuts the `width` x `height` window at (`x`, `y`) out of `image`, shrinking
/// the window where it runs past the image edges.
pub fn crop_viewport(
    image: &RenderImage,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> Result<RenderImage> {
    if image.width == 0 || image.height == 0 {
        return Err(anyhow!("cannot crop an empty image"));
    }
    let source = to_rgba(image)?;
    let x = x.min(source.width() - 1);
    let y = y.min(source.height() - 1);
    let width = width.clamp(1, source.width() - x);
    let height = height.clamp(1, source.height() - y);
    Ok(into_render_image(
        imageops::crop_imm(&source, x, y, width, height).to_image(),
    ))
}

pub(crate) fn invert_pixels(pixels: &mut [u8]) {
    for chunk in pixels.chunks_exact_mut(4) {
        chunk[0] = 255 - chunk[0];
        chunk[1] = 255 - chunk[1];
        chunk[2] = 255 - chunk[2];
    }
}

fn invert(color: [u8; 4]) -> [u8; 4] {
    [255 - color[0], 255 - color[1], 255 - color[2], color[3]]
}

fn to_rgba(image: &RenderImage) -> Result<RgbaImage> {
    RgbaImage::from_raw(image.width, image.height, image.pixels.clone()).ok_or_else(|| {
        anyhow!(
            "pixel buffer of {} bytes does not match {}x{}",
            image.pixels.len(),
            image.width,
            image.height
        )
    })
}

fn into_render_image(canvas: RgbaImage) -> RenderImage {
    let (width, height) = canvas.dimensions();
    RenderImage {
        width,
        height,
        pixels: canvas.into_raw(),
    }
}
