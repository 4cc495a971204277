use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LoadError, PageFault};

pub type DocumentId = Uuid;

static DOCUMENT_NAMESPACE: Lazy<Uuid> = Lazy::new(|| {
    Uuid::parse_str("3f0d8a52-6c1e-5b7a-9e44-1d2c7f9b0a61").unwrap_or(Uuid::NAMESPACE_URL)
});

/// Path or URL a reading session was opened with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef(String);

impl DocumentRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stable identifier derived from the reference text.
    pub fn id(&self) -> DocumentId {
        Uuid::new_v5(&DOCUMENT_NAMESPACE, self.0.as_bytes())
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub id: DocumentId,
    pub reference: DocumentRef,
    pub title: Option<String>,
    pub page_count: usize,
}

/// Load status of the document backing a viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Loading,
    Ready,
    Failed,
}

/// The viewer's record of its document. `total_pages` is zero until the
/// source reports a count, and is set at most once.
#[derive(Debug, Clone)]
pub struct Document {
    reference: DocumentRef,
    title: String,
    total_pages: usize,
    state: LoadState,
}

impl Document {
    pub fn new(reference: DocumentRef) -> Self {
        let title = reference.as_str().to_owned();
        Self {
            reference,
            title,
            total_pages: 0,
            state: LoadState::Loading,
        }
    }

    pub fn reference(&self) -> &DocumentRef {
        &self.reference
    }

    pub fn id(&self) -> DocumentId {
        self.reference.id()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LoadState::Ready && self.total_pages > 0
    }

    /// Records the page count. Returns `false` when a count was already known
    /// or the load already failed; a failed document stays in its loading
    /// presentation.
    pub fn mark_loaded(&mut self, total_pages: usize, title: Option<String>) -> bool {
        if self.state != LoadState::Loading {
            return false;
        }
        self.total_pages = total_pages;
        self.state = LoadState::Ready;
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            self.title = title;
        }
        true
    }

    /// Marks the load as failed. A document that already loaded stays loaded.
    pub fn mark_failed(&mut self) -> bool {
        if self.state == LoadState::Ready {
            return false;
        }
        self.state = LoadState::Failed;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    /// One-based page number.
    pub page_number: usize,
    pub width_hint: u32,
    pub scale: f32,
    pub dark_mode: bool,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            page_number: 1,
            width_hint: 450,
            scale: 1.0,
            dark_mode: false,
        }
    }
}

impl RenderRequest {
    /// Target pixel width after applying the scale.
    pub fn target_width(&self) -> u32 {
        let width = (self.width_hint as f32 * self.scale).round();
        if !width.is_finite() || width < 1.0 {
            1
        } else {
            width as u32
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// An opened document able to render individual pages.
pub trait DocumentSource: Send + Sync {
    fn info(&self) -> &DocumentInfo;
    fn render_page(&self, request: RenderRequest) -> Result<RenderImage, PageFault>;
}

#[async_trait::async_trait]
pub trait DocumentProvider: Send + Sync {
    async fn open(&self, reference: &DocumentRef) -> Result<Arc<dyn DocumentSource>, LoadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_is_stable_for_same_reference() {
        let first = DocumentRef::new("https://books.example/libros/7.pdf");
        let second = DocumentRef::new("https://books.example/libros/7.pdf");
        let other = DocumentRef::new("https://books.example/libros/8.pdf");

        assert_eq!(first.id(), second.id());
        assert_ne!(first.id(), other.id());
    }

    #[test]
    fn page_count_is_recorded_once() {
        let mut doc = Document::new(DocumentRef::new("sample.pdf"));
        assert_eq!(doc.total_pages(), 0);
        assert_eq!(doc.state(), LoadState::Loading);

        assert!(doc.mark_loaded(12, Some("Cuentos".into())));
        assert!(!doc.mark_loaded(40, Some("Other".into())));

        assert_eq!(doc.total_pages(), 12);
        assert_eq!(doc.title(), "Cuentos");
        assert!(!doc.mark_failed());
        assert!(doc.is_ready());
    }

    #[test]
    fn blank_title_falls_back_to_reference() {
        let mut doc = Document::new(DocumentRef::new("sample.pdf"));
        doc.mark_loaded(3, Some("   ".into()));
        assert_eq!(doc.title(), "sample.pdf");
    }

    #[test]
    fn failed_document_never_becomes_navigable() {
        let mut doc = Document::new(DocumentRef::new("missing.pdf"));
        assert!(doc.mark_failed());
        assert_eq!(doc.state(), LoadState::Failed);
        assert!(!doc.is_ready());

        assert!(!doc.mark_loaded(8, Some("Late".into())));
        assert_eq!(doc.state(), LoadState::Failed);
        assert_eq!(doc.total_pages(), 0);
        assert_eq!(doc.title(), "missing.pdf");
    }

    #[test]
    fn target_width_applies_scale() {
        let request = RenderRequest {
            page_number: 1,
            width_hint: 450,
            scale: 0.5,
            dark_mode: false,
        };
        assert_eq!(request.target_width(), 225);

        let degenerate = RenderRequest {
            scale: 0.0,
            ..request
        };
        assert_eq!(degenerate.target_width(), 1);
    }
}
