//! PDF rasterisation: render every page of a resume to JPEG via pdfium.
//!
//! ## Uniform scale
//!
//! The scale factor is derived once from the first page's width so that the
//! rendered width lands near [`TARGET_WIDTH_PX`], then applied to every page.
//! Resumes are almost always a single paper size, and one scale keeps text
//! size consistent across the pages the model sees.
//!
//! ## Blocking
//!
//! pdfium is synchronous and CPU-bound. [`PageRenderer::render`] is a
//! blocking call; async callers run it under `tokio::task::spawn_blocking`
//! (see [`crate::convert::Pipeline`]).

use crate::error::Cv2DocError;
use crate::pipeline::encode::{encode_page, PageImage};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Target rendered width in pixels.
pub const TARGET_WIDTH_PX: f32 = 1500.0;

/// Turns a resume file into ordered, transport-ready page images.
pub trait PageRenderer: Send + Sync {
    /// Render all pages in document order. Blocking.
    fn render(&self, pdf_path: &Path) -> Result<Vec<PageImage>, Cv2DocError>;
}

/// [`PageRenderer`] backed by the pdfium library.
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    library_path: Option<PathBuf>,
    target_width: f32,
}

impl PdfiumRenderer {
    /// `library_path` is a pdfium shared library or a directory holding one;
    /// `None` loads the system library.
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self {
            library_path,
            target_width: TARGET_WIDTH_PX,
        }
    }

    pub fn with_target_width(mut self, px: f32) -> Self {
        self.target_width = px;
        self
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render(&self, pdf_path: &Path) -> Result<Vec<PageImage>, Cv2DocError> {
        let pdfium = bind_pdfium(self.library_path.as_deref())?;

        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| Cv2DocError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        let first = pages.first().map_err(|_| Cv2DocError::EmptyDocument {
            path: pdf_path.to_path_buf(),
        })?;

        let scale = scale_for_width(first.width().value, self.target_width);
        info!("PDF loaded: {} pages, scale ×{}", total_pages, scale);

        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let mut images = Vec::with_capacity(total_pages);

        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                Cv2DocError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );

            let encoded = encode_page(&image).map_err(|e| Cv2DocError::ImageEncodingFailed {
                page: idx + 1,
                detail: e.to_string(),
            })?;
            images.push(encoded);
        }

        Ok(images)
    }
}

/// Integer magnification that brings `width_pt` up to roughly `target_px`.
///
/// Rounds up so the rendered page is never narrower than the target; never
/// below 1.
pub fn scale_for_width(width_pt: f32, target_px: f32) -> f32 {
    if width_pt.is_nan() || width_pt <= 0.0 {
        return 1.0;
    }
    (target_px / width_pt).ceil().max(1.0)
}

/// Bind to pdfium: an explicit file, a directory holding the platform
/// library, or the system library.
pub fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, Cv2DocError> {
    let bindings = match library_path {
        Some(path) if path.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
        }
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| Cv2DocError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}
