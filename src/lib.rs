//! # cv2doc
//!
//! Turn resume PDFs into filled Word documents using a vision language model.
//!
//! Each page of the resume is rasterised and sent, together with an
//! operator-supplied prompt, to a model constrained to answer with a fixed
//! JSON schema. The validated record is saved as JSON and bound into a
//! `.docx` template.
//!
//! ## Pipeline Overview
//!
//! ```text
//! resume.pdf
//!  │
//!  ├─ 1. Render    rasterise every page via pdfium (spawn_blocking)
//!  ├─ 2. Encode    JPEG → base64 PageImage
//!  ├─ 3. Extract   one structured-output Gemini call → ResumeRecord
//!  ├─ 4. Persist   {json_output_dir}/{stem}.json (French alias keys)
//!  └─ 5. Template  {results_dir}/{stem}.docx
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cv2doc::{Pipeline, Settings};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // AI_API_KEY, PROMPT_PATH, JSON_OUTPUT_DIR, RESULTS_DIR, DOX_TEMPLATE_PATH
//!     let settings = Settings::from_env()?;
//!     let pipeline = Pipeline::from_settings(settings)?;
//!     let docx = pipeline.run_processing(Path::new("cv/jane.pdf")).await?;
//!     println!("{}", docx.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | The `cv2doc` batch binary (clap + indicatif + tracing-subscriber) |
//! | `server` | on      | The [`service`] module and the `cv2doc-server` binary (axum) |
//!
//! Disable both when using only the library:
//! ```toml
//! cv2doc = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod schema;
#[cfg(feature = "server")]
pub mod service;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ApiKey, Settings, SettingsBuilder};
pub use convert::{run_processing, Pipeline};
pub use error::Cv2DocError;
pub use pipeline::encode::PageImage;
pub use pipeline::extract::{GeminiExtractor, ResumeExtractor};
pub use pipeline::input::collect_pdfs;
pub use pipeline::render::{PageRenderer, PdfiumRenderer};
pub use pipeline::template::render_json_to_docx;
pub use progress::{BatchProgressCallback, NoopProgressCallback};
pub use schema::{Experience, Expertise, Language, ResumeRecord, SoftSkill};
