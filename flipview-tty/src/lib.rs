use std::io::{self, Write};

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use crossterm::{
    cursor,
    terminal::{Clear, ClearType},
};
use flipview_core::{RenderImage, Theme, ViewerSnapshot};
use png::{BitDepth, ColorType, Encoder};
use tracing::trace;

mod input;

pub use input::{CellSize, EventMapper, UiEvent};

const CHUNK_SIZE: usize = 4096;

/// Terminal cell rectangle an image is scaled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub column: u16,
    pub row: u16,
    pub columns: u32,
    pub rows: u32,
}

impl Placement {
    pub fn clamped(column: u16, row: u16, columns: u32, rows: u32) -> Self {
        Self {
            column,
            row,
            columns: columns.max(1),
            rows: rows.max(1),
        }
    }
}

/// Draws images through the kitty graphics protocol. Each frame starts with
/// [`KittyCanvas::clear_images`] so stale placements never linger.
pub struct KittyCanvas<W: Write> {
    writer: W,
    next_image_id: u32,
}

impl<W: Write> KittyCanvas<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            next_image_id: 1,
        }
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Transmits and places `image`, returning the image id used.
    pub fn draw(&mut self, image: &RenderImage, placement: Placement) -> Result<u32> {
        let mut buffer = Vec::new();
        let mut encoder = Encoder::new(&mut buffer, image.width, image.height);
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(BitDepth::Eight);
        let mut png_writer = encoder.write_header()?;
        png_writer.write_image_data(&image.pixels)?;
        png_writer.finish()?;

        let id = self.next_image_id;
        self.next_image_id = self.next_image_id.wrapping_add(1).max(1);

        crossterm::queue!(self.writer, cursor::MoveTo(placement.column, placement.row))?;

        let encoded = BASE64.encode(&buffer);
        let mut chunks = encoded.as_bytes().chunks(CHUNK_SIZE).peekable();
        let mut first = true;
        while let Some(chunk) = chunks.next() {
            let more = u8::from(chunks.peek().is_some());
            if first {
                write!(
                    self.writer,
                    "\u{1b}_Ga=T,f=100,C=1,q=2,i={id},c={},r={},s={},v={},m={more}",
                    placement.columns, placement.rows, image.width, image.height,
                )?;
                first = false;
            } else {
                write!(self.writer, "\u{1b}_Gm={more},q=2")?;
            }
            if !chunk.is_empty() {
                self.writer.write_all(b";")?;
                self.writer.write_all(chunk)?;
            }
            write!(self.writer, "\u{1b}\\")?;
        }

        self.writer.flush()?;
        trace!(id, bytes = encoded.len(), "image transmitted");
        Ok(id)
    }

    /// Deletes every placement and frees the image data.
    pub fn clear_images(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}_Ga=d,d=A,q=2\u{1b}\\")?;
        self.next_image_id = 1;
        Ok(())
    }

    pub fn begin_sync_update(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}[?2026h")?;
        Ok(())
    }

    /// The terminal presents everything buffered since `begin_sync_update`.
    pub fn end_sync_update(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}[?2026l")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn clear_all(&mut self) -> Result<()> {
        crossterm::execute!(
            &mut self.writer,
            Clear(ClearType::All),
            cursor::MoveTo(0, 0)
        )?;
        Ok(())
    }
}

/// Page indicator, mode and zoom for the bottom line.
pub fn status_line(snapshot: &ViewerSnapshot, pending: Option<&str>) -> String {
    let mut line = if snapshot.load_failed {
        format!("{}: failed to load document", snapshot.title)
    } else if snapshot.loading {
        format!("{}: loading document...", snapshot.title)
    } else {
        format!(
            "{}  page {} of {}  [{}]  {}%",
            snapshot.title,
            snapshot.current_page,
            snapshot.total_pages,
            snapshot.mode.label(),
            snapshot.zoom_percent()
        )
    };
    if snapshot.theme == Theme::Dark {
        line.push_str("  dark");
    }
    if let Some(pending) = pending {
        line.push_str("  ");
        line.push_str(pending);
    }
    line
}

pub fn write_status_line<W: Write>(writer: &mut W, row: u16, label: &str) -> io::Result<()> {
    crossterm::queue!(
        writer,
        cursor::MoveTo(0, row),
        Clear(ClearType::CurrentLine)
    )?;
    write!(writer, "{}", label)?;
    writer.flush()
}
