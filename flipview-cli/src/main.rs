use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use crossterm::cursor;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture};
use crossterm::terminal;
use directories::ProjectDirs;
use flipview_core::{
    Command, DocumentRef, DocumentSource, FlipBook, RenderImage, RenderSurface, Theme,
    ViewMode, ViewerConfig, ViewerEngine, ViewerEvent, ViewerOptions, ViewportClass,
};
use flipview_render::{
    compose_spread, crop_viewport, render_visible, stack_vertical, PdfiumDocumentProvider,
    PdfiumLibrary,
};
use flipview_tty::{
    status_line, write_status_line, CellSize, EventMapper, KittyCanvas, Placement, UiEvent,
};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(
    name = "flipview",
    version,
    about = "Paginated PDF viewer for kitty-compatible terminals"
)]
struct Args {
    /// Path of the PDF document to open
    document: PathBuf,

    /// Page to open on (1-based)
    #[arg(short = 'p', long = "page")]
    page: Option<usize>,

    /// Presentation mode to start in
    #[arg(short = 'm', long = "mode", value_enum)]
    mode: Option<ModeArg>,

    #[arg(short = 't', long = "theme", value_enum, default_value_t = ThemeArg::Light)]
    theme: ThemeArg,

    /// Configuration file (defaults to config.toml in the platform config dir)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Explicit location of the pdfium shared library
    #[arg(long = "pdfium")]
    pdfium: Option<PathBuf>,

    /// Viewport width in pixels used to classify the display (defaults to the terminal)
    #[arg(long = "viewport-width")]
    viewport_width: Option<u32>,

    /// Print the viewer state as JSON after loading and exit
    #[arg(long = "print-state")]
    print_state: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Single,
    Scroll,
    Book,
}

impl From<ModeArg> for ViewMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Single => ViewMode::Single,
            ModeArg::Scroll => ViewMode::Scroll,
            ModeArg::Book => ViewMode::Book,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(theme: ThemeArg) -> Self {
        match theme {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}

struct RawModeGuard;

impl RawModeGuard {
    fn new() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = crossterm::execute!(stdout, cursor::Show);
    }
}

struct MouseCaptureGuard;

impl MouseCaptureGuard {
    fn new() -> Result<Self> {
        crossterm::execute!(io::stdout(), EnableMouseCapture)?;
        Ok(Self)
    }
}

impl Drop for MouseCaptureGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(io::stdout(), DisableMouseCapture);
    }
}

/// Terminal size in cells plus the pixel size of one cell.
#[derive(Debug, Clone, Copy)]
struct Viewport {
    columns: u16,
    rows: u16,
    cell: CellSize,
}

impl Viewport {
    /// Zero-sized reports are treated as a single cell.
    fn from_cells(columns: u16, rows: u16, cell: CellSize) -> Self {
        Self {
            columns: columns.max(1),
            rows: rows.max(1),
            cell,
        }
    }

    fn query() -> Result<Self> {
        let window = terminal::window_size()?;
        let columns = window.columns.max(1);
        let rows = window.rows.max(1);
        // Some terminals do not report pixel sizes.
        let cell = if window.width == 0 || window.height == 0 {
            CellSize::default()
        } else {
            CellSize {
                width: f32::from(window.width) / f32::from(columns),
                height: f32::from(window.height) / f32::from(rows),
            }
        };
        Ok(Self::from_cells(columns, rows, cell))
    }

    fn pixel_width(&self) -> u32 {
        (f32::from(self.columns) * self.cell.width).round() as u32
    }

    /// Rows left for page imagery once the status line is reserved.
    fn image_rows(&self) -> u16 {
        self.rows.saturating_sub(1).max(1)
    }

    fn image_pixel_height(&self) -> u32 {
        (f32::from(self.image_rows()) * self.cell.height).round() as u32
    }

    fn status_row(&self) -> u16 {
        self.rows.saturating_sub(1)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let project_dirs = ProjectDirs::from("org", "flipview", "flipview")
        .ok_or_else(|| anyhow!("unable to resolve platform directories"))?;
    let _log_guard = init_logging(&project_dirs)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| project_dirs.config_dir().join("config.toml"));
    let config = load_config(&config_path, args.config.is_some())?;

    let terminal_width = Viewport::query().ok().map(|viewport| viewport.pixel_width());
    let viewport_width = args.viewport_width.or(terminal_width);
    let viewport = viewport_width
        .map(|width| ViewportClass::from_width(width, config.mobile_breakpoint))
        .unwrap_or(ViewportClass::Desktop);

    let flip = FlipBook::new(config.show_cover);
    let reference = DocumentRef::new(args.document.to_string_lossy());
    let mut engine = ViewerEngine::new(
        reference,
        ViewerOptions {
            theme: args.theme.into(),
            viewport,
            config,
        },
        Box::new(flip.clone()),
    )
    .context("invalid viewer configuration")?;

    let provider = PdfiumDocumentProvider::new(PdfiumLibrary::new(args.pdfium.clone()));
    let source = engine.open_with(&provider).await;
    if let Some(source) = &source {
        flip.set_page_count(source.info().page_count);
    }

    if let Some(mode) = args.mode {
        engine.set_mode(mode.into());
    }
    if let Some(page) = args.page {
        if !engine.go_to_page(page) {
            warn!(page, "requested start page is out of range");
        }
    }
    settle_flips(&mut engine, &flip);
    engine.events().lock().clear();

    if args.print_state {
        let snapshot = engine.snapshot();
        println!("{}", snapshot.to_json_pretty()?);
        return Ok(());
    }

    if source.is_none() {
        return Err(anyhow!("failed to open {}", args.document.display()));
    }

    let _raw = RawModeGuard::new()?;
    let _mouse = MouseCaptureGuard::new()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, cursor::Hide)?;
    engine.mount();
    let result = run(&mut engine, &flip, source.as_deref(), stdout);
    engine.unmount();
    result
}

fn run(
    engine: &mut ViewerEngine,
    flip: &FlipBook,
    source: Option<&dyn DocumentSource>,
    stdout: io::Stdout,
) -> Result<()> {
    let mut canvas = KittyCanvas::new(stdout);
    let mut mapper = EventMapper::new();
    let mut viewport = Viewport::query()?;
    mapper.set_cell_size(viewport.cell);
    report_viewport(engine, &viewport);
    let events = engine.events();
    let mut dirty = true;

    loop {
        if dirty {
            let pending = mapper.pending_input();
            redraw(&mut canvas, engine, flip, source, &viewport, pending.as_deref())?;
            dirty = false;
        }

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }

        match mapper.map_event(event::read()?) {
            UiEvent::Quit => break,
            UiEvent::Resize { columns, rows } => {
                viewport = Viewport::query()
                    .unwrap_or_else(|_| Viewport::from_cells(columns, rows, viewport.cell));
                mapper.set_cell_size(viewport.cell);
                report_viewport(engine, &viewport);
                dirty = true;
            }
            UiEvent::Command(command) => {
                let submitted = matches!(command, Command::SubmitPageInput);
                let changed = engine.apply(command);
                if submitted && changed {
                    mapper.end_page_input();
                }
                // the page field is drawn on the status line even when nothing else moved
                dirty |= changed || mapper.is_editing_page() || submitted;
            }
            UiEvent::None => {}
        }

        settle_flips(engine, flip);
        for event in events.lock().drain(..) {
            match event {
                ViewerEvent::ModeChanged { from, to } => {
                    debug!(from = from.label(), to = to.label(), "mode changed")
                }
                ViewerEvent::ScrollIntoView { page } => debug!(page, "scrolled into view"),
                _ => {}
            }
            dirty = true;
        }
    }

    let mut writer = canvas.writer();
    crossterm::execute!(&mut writer, terminal::Clear(terminal::ClearType::All))?;
    canvas.clear_images()?;
    canvas.writer().flush()?;
    Ok(())
}

fn report_viewport(engine: &mut ViewerEngine, viewport: &Viewport) {
    engine.set_viewport_width(viewport.pixel_width());
    engine.set_viewport_height(viewport.image_pixel_height());
}

/// Forwards every settled flip to the engine.
fn settle_flips(engine: &mut ViewerEngine, flip: &FlipBook) {
    for index in flip.take_settlements() {
        engine.on_flip_settled(index);
    }
}

fn redraw<W: Write>(
    canvas: &mut KittyCanvas<W>,
    engine: &ViewerEngine,
    flip: &FlipBook,
    source: Option<&dyn DocumentSource>,
    viewport: &Viewport,
    pending: Option<&str>,
) -> Result<()> {
    canvas.begin_sync_update()?;
    canvas.clear_images()?;
    canvas.clear_all()?;

    if let Some(source) = source {
        if let Some(frame) = compose_frame(engine, flip, source, viewport)? {
            let columns = (frame.width as f32 / viewport.cell.width).ceil() as u32;
            let rows = (frame.height as f32 / viewport.cell.height).ceil() as u32;
            let columns = columns.min(u32::from(viewport.columns));
            let rows = rows.min(u32::from(viewport.image_rows()));
            let left = (u32::from(viewport.columns) - columns) / 2;
            let placement = Placement::clamped(left as u16, 0, columns, rows);
            canvas.draw(&frame, placement)?;
        }
    }

    let label = status_line(&engine.snapshot(), pending);
    write_status_line(canvas.writer(), viewport.status_row(), &label)?;
    canvas.end_sync_update()?;
    Ok(())
}

/// Renders what the current layout shows and cuts out the visible window.
fn compose_frame(
    engine: &ViewerEngine,
    flip: &FlipBook,
    source: &dyn DocumentSource,
    viewport: &Viewport,
) -> Result<Option<RenderImage>> {
    let surface = engine.surface();
    let config = engine.config();
    let offset = engine.scroll_offset();
    let view_width = viewport.pixel_width();
    let view_height = viewport.image_pixel_height();

    let spread = match &surface {
        RenderSurface::Book { index, .. } => flip.spread(*index),
        _ => (0, None),
    };
    let pages = render_visible(
        source,
        &surface,
        config,
        offset.y,
        view_height as f32,
        spread,
    );
    let Some(first_page) = pages.first().map(|page| page.page_number) else {
        return Ok(None);
    };
    let mut images: Vec<RenderImage> = pages.into_iter().map(|page| page.image).collect();

    let (image, origin_x, origin_y) = match &surface {
        RenderSurface::Loading { .. } => return Ok(None),
        RenderSurface::Scroll { geometry, .. } => {
            let scale = engine.scale();
            let gap = (config.page_gap as f32 * scale).round() as u32;
            let slot_height = (geometry.page_height * scale).round() as u32;
            let top = geometry.page_top(first_page) * scale;
            (
                stack_vertical(&images, slot_height, gap)?,
                offset.x,
                offset.y - top,
            )
        }
        RenderSurface::Book { .. } => {
            let right = images.get(1);
            (compose_spread(&images[0], right)?, 0.0, 0.0)
        }
        RenderSurface::Single { .. } => (images.swap_remove(0), offset.x, offset.y),
    };

    let frame = crop_viewport(
        &image,
        origin_x.max(0.0) as u32,
        origin_y.max(0.0) as u32,
        view_width,
        view_height,
    )?;
    Ok(Some(frame))
}

fn load_config(path: &Path, explicit: bool) -> Result<ViewerConfig> {
    let config = if explicit {
        ViewerConfig::load(path)
    } else {
        ViewerConfig::load_or_default(path)
    };
    let config = config.with_context(|| format!("failed to load {}", path.display()))?;
    info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

fn init_logging(project_dirs: &ProjectDirs) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "flipview.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The terminal belongs to the graphics canvas, so logs only go to the file.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_resize_report_keeps_one_cell() {
        let viewport = Viewport::from_cells(0, 0, CellSize::default());
        assert_eq!((viewport.columns, viewport.rows), (1, 1));
        assert_eq!(viewport.status_row(), 0);
        assert_eq!(viewport.image_rows(), 1);
        assert_eq!(viewport.pixel_width(), 8);
        assert_eq!(viewport.image_pixel_height(), 16);
    }

    #[test]
    fn status_line_takes_the_last_row() {
        let cell = CellSize {
            width: 10.0,
            height: 20.0,
        };
        let viewport = Viewport::from_cells(120, 40, cell);
        assert_eq!(viewport.status_row(), 39);
        assert_eq!(viewport.image_rows(), 39);
        assert_eq!(viewport.pixel_width(), 1200);
        assert_eq!(viewport.image_pixel_height(), 780);
    }
}
