use std::convert::TryFrom;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use flipview_core::{
    DocumentInfo, DocumentProvider, DocumentRef, DocumentSource, LoadError, PageFault,
    RenderImage, RenderRequest,
};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use tracing::{debug, instrument, warn};

use crate::invert_pixels;

/// Lazily bound pdfium library. Binding happens on the first successful path
/// lookup so hosts can start without the shared library present.
pub struct PdfiumLibrary {
    explicit_path: Option<PathBuf>,
    pdfium: OnceCell<Arc<Pdfium>>,
}

impl PdfiumLibrary {
    pub fn new(explicit_path: Option<PathBuf>) -> Self {
        Self {
            explicit_path,
            pdfium: OnceCell::new(),
        }
    }

    fn get(&self) -> Result<Arc<Pdfium>> {
        self.pdfium
            .get_or_try_init(|| {
                let pdfium = match self.explicit_path.as_deref().and_then(bind_explicit) {
                    Some(pdfium) => pdfium,
                    None => bind_default()?,
                };
                Ok(Arc::new(pdfium))
            })
            .map(Arc::clone)
    }
}

pub struct PdfiumDocumentProvider {
    library: PdfiumLibrary,
}

impl PdfiumDocumentProvider {
    pub fn new(library: PdfiumLibrary) -> Self {
        Self { library }
    }
}

#[async_trait]
impl DocumentProvider for PdfiumDocumentProvider {
    #[instrument(skip(self, reference), fields(reference = %reference))]
    async fn open(&self, reference: &DocumentRef) -> Result<Arc<dyn DocumentSource>, LoadError> {
        let path = Path::new(reference.as_str());
        let absolute = path.canonicalize().map_err(|_| LoadError::NotFound {
            reference: reference.to_string(),
        })?;
        let unreadable = |err: anyhow::Error| LoadError::Unreadable {
            reference: reference.to_string(),
            message: format!("{err:#}"),
        };
        let pdfium = self.library.get().map_err(unreadable)?;
        let document = open_document(&pdfium, &absolute).map_err(unreadable)?;
        let info = build_document_info(&document, reference);
        debug!(pages = info.page_count, "document opened");
        Ok(Arc::new(PdfiumDocument {
            document: Mutex::new(document),
            info,
            pdfium,
        }))
    }
}

struct PdfiumDocument {
    // Declared before `pdfium` so it drops first.
    document: Mutex<PdfDocument<'static>>,
    info: DocumentInfo,
    #[allow(dead_code)]
    pdfium: Arc<Pdfium>,
}

impl PdfiumDocument {
    fn render_internal(&self, request: &RenderRequest) -> Result<RenderImage> {
        let page_index = request
            .page_number
            .checked_sub(1)
            .and_then(|index| PdfPageIndex::try_from(index).ok())
            .ok_or_else(|| anyhow!("page {} is out of supported range", request.page_number))?;

        let document = self.document.lock();
        let page = document
            .pages()
            .get(page_index)
            .with_context(|| format!("page {} out of range", request.page_number))?;

        let target_width = i32::try_from(request.target_width()).unwrap_or(i32::MAX);
        let config = PdfRenderConfig::new().set_target_width(target_width);
        let bitmap = page
            .render_with_config(&config)
            .with_context(|| format!("failed to render page {}", request.page_number))?;
        let image = bitmap.as_image().to_rgba8();
        let mut pixels = image.into_raw();

        if request.dark_mode {
            invert_pixels(&mut pixels);
        }

        Ok(RenderImage {
            width: u32::try_from(bitmap.width()).unwrap_or_default(),
            height: u32::try_from(bitmap.height()).unwrap_or_default(),
            pixels,
        })
    }
}

impl DocumentSource for PdfiumDocument {
    fn info(&self) -> &DocumentInfo {
        &self.info
    }

    #[instrument(skip(self))]
    fn render_page(&self, request: RenderRequest) -> Result<RenderImage, PageFault> {
        if request.page_number == 0 || request.page_number > self.info.page_count {
            return Err(PageFault::OutOfRange {
                page: request.page_number,
            });
        }
        self.render_internal(&request).map_err(|err| PageFault::Render {
            page: request.page_number,
            message: format!("{err:#}"),
        })
    }
}

fn open_document(pdfium: &Pdfium, path: &Path) -> Result<PdfDocument<'static>> {
    let document = pdfium
        .load_pdf_from_file(path, None)
        .with_context(|| format!("failed to open {:?}", path))?;
    // SAFETY: the document borrows the bindings inside `pdfium`. `PdfiumDocument`
    // keeps an `Arc` to the same bindings and declares `document` first, so the
    // document is dropped while the bindings are still alive.
    let document = unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) };
    Ok(document)
}

fn build_document_info(document: &PdfDocument<'_>, reference: &DocumentRef) -> DocumentInfo {
    let page_count = usize::try_from(document.pages().len()).unwrap_or_default();
    let title = document
        .metadata()
        .get(PdfDocumentMetadataTagType::Title)
        .map(|tag| tag.value().trim().to_owned())
        .filter(|title| !title.is_empty());

    DocumentInfo {
        id: reference.id(),
        reference: reference.clone(),
        title,
        page_count,
    }
}

fn bind_explicit(path: &Path) -> Option<Pdfium> {
    match Pdfium::bind_to_library(path) {
        Ok(bindings) => Some(Pdfium::new(bindings)),
        Err(err) => {
            warn!(
                "failed to load pdfium from configured path {}: {}",
                path.display(),
                err
            );
            None
        }
    }
}

fn bind_default() -> Result<Pdfium> {
    let mut errors = Vec::new();

    let cwd_path = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&cwd_path) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(err) => errors.push(format!("{}: {}", cwd_path.display(), err)),
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("system: {err}"));
            Err(anyhow!(
                "failed to bind to a pdfium library; ensure it is installed ({})",
                errors.join(", ")
            ))
        }
    }
}
