//! Error types for the cv2doc library.
//!
//! Every failure is fatal for the run that hit it: there are no retries and
//! no partial documents. [`Cv2DocError`] groups failures by where they come
//! from, which is also how the HTTP service decides on a status code:
//!
//! * input errors (missing path, non-PDF upload) are the caller's fault;
//! * provider errors come from the language-model call and are split into
//!   quota exhaustion and everything else;
//! * contract errors mean the model or a JSON file broke the record shape;
//! * I/O and configuration errors cover the rest.

use std::path::PathBuf;
use thiserror::Error;

/// Markers that identify a quota or rate-limit failure in free-form error text.
///
/// Matching is case-insensitive. Structured signals (HTTP 429, a
/// `RESOURCE_EXHAUSTED` status) are checked first at the provider boundary;
/// this list is the fallback for errors that only carry a message.
pub const QUOTA_MARKERS: &[&str] = &["429", "resource_exhausted", "rate limit", "quota"];

/// All errors returned by the cv2doc library.
#[derive(Debug, Error)]
pub enum Cv2DocError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input path does not exist.
    #[error("Path not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Input file does not have a `.pdf` extension.
    #[error("Not a PDF file: '{path}'")]
    NotAPdf { path: PathBuf },

    /// A directory was given but it holds no PDF files.
    #[error("'{path}' does not contain any PDF files")]
    NoPdfsFound { path: PathBuf },

    /// An upload was declared with a content type other than PDF.
    #[error("Only PDF files are supported (got content type '{content_type}')")]
    UnsupportedMediaType { content_type: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH to the pdfium shared library (or the directory holding it)."
    )]
    PdfiumBindingFailed(String),

    /// PDF could not be opened or parsed.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF opened fine but has no pages to render.
    #[error("PDF '{path}' has no pages")]
    EmptyDocument { path: PathBuf },

    /// pdfium failed to rasterise a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// A rendered page could not be encoded for transport.
    #[error("Image encoding failed for page {page}: {detail}")]
    ImageEncodingFailed { page: usize, detail: String },

    // ── Provider errors ───────────────────────────────────────────────────
    /// The provider reported that a rate or usage limit was reached.
    #[error("LLM quota exhausted: {message}")]
    QuotaExhausted { message: String },

    /// Any other failure of the language-model call.
    #[error("LLM provider error: {message}")]
    Provider { message: String },

    // ── Contract errors ───────────────────────────────────────────────────
    /// Model output (or a JSON record) does not match the resume schema.
    #[error("Extracted data does not match the resume schema: {detail}")]
    SchemaViolation { detail: String },

    /// Template context JSON is valid but its root is not an object.
    #[error("JSON root must be an object (key/value mapping), got {found}")]
    TemplateRootNotObject { found: String },

    /// The template file is not a readable .docx archive.
    #[error("Invalid document template '{path}': {detail}")]
    InvalidTemplate { path: PathBuf, detail: String },

    /// The template engine rejected a template part.
    #[error("Template rendering failed: {detail}")]
    TemplateRender { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The prompt file could not be read.
    #[error("Failed to read prompt file '{path}': {source}")]
    PromptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// A required setting is absent or empty.
    #[error("Missing required setting {name}\nSet it in the environment or in a .env file.")]
    MissingSetting { name: &'static str },

    /// A setting is present but cannot be parsed.
    #[error("Invalid value for setting {name}: {detail}")]
    InvalidSetting { name: &'static str, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Cv2DocError {
    /// True when the failure is a provider rate/usage limit.
    ///
    /// Typed [`Cv2DocError::QuotaExhausted`] always qualifies. A generic
    /// [`Cv2DocError::Provider`] qualifies when its text carries one of the
    /// [`QUOTA_MARKERS`]; that substring match is fragile and only covers
    /// providers that do not expose a structured code.
    pub fn is_quota_exhausted(&self) -> bool {
        match self {
            Cv2DocError::QuotaExhausted { .. } => true,
            Cv2DocError::Provider { message } => mentions_quota(message),
            _ => false,
        }
    }

    /// Raw provider message, for either provider variant.
    pub fn provider_message(&self) -> Option<&str> {
        match self {
            Cv2DocError::QuotaExhausted { message } | Cv2DocError::Provider { message } => {
                Some(message)
            }
            _ => None,
        }
    }

    /// True for record-shape violations, whether from the model or a JSON file.
    pub fn is_schema_violation(&self) -> bool {
        matches!(
            self,
            Cv2DocError::SchemaViolation { .. } | Cv2DocError::TemplateRootNotObject { .. }
        )
    }
}

/// Case-insensitive check of `text` against [`QUOTA_MARKERS`].
pub fn mentions_quota(text: &str) -> bool {
    let lower = text.to_lowercase();
    QUOTA_MARKERS.iter().any(|marker| lower.contains(marker))
}
