//! Input resolution: turn a user-supplied path into the list of resumes to process.
//!
//! A directory yields its immediate `.pdf` files (case-insensitive, no
//! recursion) in directory-listing order. A file is accepted only with a
//! `.pdf` extension. Content is not sniffed here; pdfium reports a broken
//! file as [`Cv2DocError::CorruptPdf`] when it is opened.

use crate::error::Cv2DocError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Content types accepted for uploaded resumes.
pub const PDF_CONTENT_TYPES: &[&str] = &["application/pdf", "application/x-pdf"];

/// True for a declared PDF content type. Parameters (`; charset=…`) are ignored.
pub fn is_pdf_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    PDF_CONTENT_TYPES.contains(&essence.as_str())
}

/// True when `path` has a `.pdf` extension, in any case.
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Resolve `path` to the PDF files to process.
///
/// # Errors
/// * [`Cv2DocError::FileNotFound`] when `path` does not exist
/// * [`Cv2DocError::NotAPdf`] for a file without a `.pdf` extension
/// * [`Cv2DocError::NoPdfsFound`] for a directory with no PDF files
pub fn collect_pdfs(path: &Path) -> Result<Vec<PathBuf>, Cv2DocError> {
    if path.is_dir() {
        let entries = std::fs::read_dir(path).map_err(|e| {
            Cv2DocError::Internal(format!("Cannot list '{}': {}", path.display(), e))
        })?;

        let mut pdfs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                Cv2DocError::Internal(format!("Cannot list '{}': {}", path.display(), e))
            })?;
            let candidate = entry.path();
            if candidate.is_file() && has_pdf_extension(&candidate) {
                pdfs.push(candidate);
            }
        }

        if pdfs.is_empty() {
            return Err(Cv2DocError::NoPdfsFound {
                path: path.to_path_buf(),
            });
        }
        debug!("Found {} PDF(s) in {}", pdfs.len(), path.display());
        Ok(pdfs)
    } else if path.is_file() {
        if has_pdf_extension(path) {
            Ok(vec![path.to_path_buf()])
        } else {
            Err(Cv2DocError::NotAPdf {
                path: path.to_path_buf(),
            })
        }
    } else {
        Err(Cv2DocError::FileNotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Output name for a resume: the file name up to its first `.`.
///
/// `jane.doe.pdf` → `jane`. Falls back to `cv` when nothing usable remains.
pub fn file_stem(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .filter(|s| !s.is_empty())
        .unwrap_or("cv")
        .to_string()
}

/// Reduce a client-supplied upload name to a bare file name.
///
/// Directory components, control characters and `"` are dropped; Unicode and
/// spaces are kept so the stem still names the outputs. An empty or
/// dot-only result falls back to `cv.pdf`.
pub fn sanitize_upload_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.trim_matches('.').is_empty() {
        "cv.pdf".to_string()
    } else {
        cleaned.to_string()
    }
}
