//! State machine behind the paginated document viewer: presentation modes,
//! the tracked page, zoom and drag panning. Rendering and page-flip animation
//! are collaborators reached through [`DocumentSource`] and [`FlipEngine`].

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod flip;
pub mod mode;
pub mod position;
pub mod surface;
pub mod zoom;

pub use config::ViewerConfig;
pub use document::{
    Document, DocumentId, DocumentInfo, DocumentProvider, DocumentRef, DocumentSource, LoadState,
    RenderImage, RenderRequest,
};
pub use engine::{ViewerEngine, ViewerOptions, ViewerSnapshot};
pub use error::{ConfigError, LoadError, PageFault};
pub use flip::{FlipBook, FlipEngine};
pub use mode::{Layout, ModeController, ModeSwitch, ViewMode, ViewportClass};
pub use position::{PositionTracker, Reconciliation};
pub use surface::{page_element_id, PageSlot, RenderSurface, StackGeometry, Theme};
pub use zoom::{PointerButton, PointerPosition, ScrollOffset, ZoomPan};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    NextPage,
    PrevPage,
    GotoPage { page: usize },
    FirstPage,
    LastPage,
    SetPageInput { text: String },
    SubmitPageInput,
    ResetPageInput,
    SetMode { mode: ViewMode },
    ZoomIn,
    ZoomOut,
    ZoomBy { delta: f32 },
    ToggleTheme,
    SetViewportWidth { width: u32 },
    SetViewportHeight { height: u32 },
    PointerDown { button: PointerButton, x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    PointerUp,
    ScrollBy { delta_x: f32, delta_y: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    DocumentLoaded { total_pages: usize },
    DocumentFailed,
    ModeChanged { from: ViewMode, to: ViewMode },
    ScrollIntoView { page: usize },
    RedrawNeeded,
}
