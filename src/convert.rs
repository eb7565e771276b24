//! End-to-end conversion: resume PDF → JSON record → filled `.docx`.
//!
//! [`Pipeline`] bundles the process [`Settings`] with the two external
//! seams, a [`PageRenderer`] and a [`ResumeExtractor`]. The binaries build
//! one with [`Pipeline::from_settings`]; tests inject stubs through
//! [`Pipeline::new`].
//!
//! Every failure is fatal for the file being processed: no partial
//! documents, no retries. Outputs are written atomically (temp file +
//! rename) and a rerun for the same stem overwrites them.

use crate::config::Settings;
use crate::error::Cv2DocError;
use crate::pipeline::extract::{GeminiExtractor, ResumeExtractor};
use crate::pipeline::input::file_stem;
use crate::pipeline::output_staging_file;
use crate::pipeline::render::{PageRenderer, PdfiumRenderer};
use crate::pipeline::template::render_json_to_docx;
use crate::progress::BatchProgressCallback;
use crate::schema::ResumeRecord;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Renderer → extractor → templater, with the settings they share.
#[derive(Clone)]
pub struct Pipeline {
    settings: Arc<Settings>,
    renderer: Arc<dyn PageRenderer>,
    extractor: Arc<dyn ResumeExtractor>,
}

impl Pipeline {
    pub fn new(
        settings: Settings,
        renderer: Arc<dyn PageRenderer>,
        extractor: Arc<dyn ResumeExtractor>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            renderer,
            extractor,
        }
    }

    /// Wire the pdfium renderer and the Gemini extractor.
    pub fn from_settings(settings: Settings) -> Result<Self, Cv2DocError> {
        let renderer = PdfiumRenderer::new(settings.pdfium_library_path.clone());
        let extractor = GeminiExtractor::from_settings(&settings)?;
        Ok(Self::new(settings, Arc::new(renderer), Arc::new(extractor)))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Render and extract only; nothing is written.
    pub async fn extract_record(&self, pdf_path: &Path) -> Result<ResumeRecord, Cv2DocError> {
        let start = Instant::now();
        let renderer = Arc::clone(&self.renderer);
        let path = pdf_path.to_path_buf();

        let pages = tokio::task::spawn_blocking(move || renderer.render(&path))
            .await
            .map_err(|e| Cv2DocError::Internal(format!("Render task panicked: {}", e)))??;
        debug!("Rendered {} page(s) in {:?}", pages.len(), start.elapsed());

        let record = self.extractor.extract(&pages).await?;
        info!(
            "Extracted record for '{}' ({} experiences) in {:?}",
            record.full_name,
            record.experiences.len(),
            start.elapsed()
        );
        Ok(record)
    }

    /// Process one resume and return the path of the generated document.
    ///
    /// Writes `{json_output_dir}/{stem}.json` (alias keys, 2-space indent)
    /// and `{results_dir}/{stem}.docx`, creating both directories.
    pub async fn run_processing(&self, pdf_path: &Path) -> Result<PathBuf, Cv2DocError> {
        info!("Processing resume: {}", pdf_path.display());
        let stem = file_stem(pdf_path);

        let record = self.extract_record(pdf_path).await?;

        let json_path = self.settings.json_output_dir.join(format!("{stem}.json"));
        let json = record.to_aliased_json_pretty()?;
        let docx_path = self.settings.results_dir.join(format!("{stem}.docx"));
        let template = self.settings.template_path.clone();
        let output = docx_path.clone();

        tokio::task::spawn_blocking(move || {
            write_atomic(&json_path, json.as_bytes())?;
            debug!("Record written to {}", json_path.display());
            render_json_to_docx(&template, &output, &json_path)
        })
        .await
        .map_err(|e| Cv2DocError::Internal(format!("Output task panicked: {}", e)))??;

        Ok(docx_path)
    }

    /// Process `inputs` in order, stopping at the first failure.
    pub async fn run_batch(
        &self,
        inputs: &[PathBuf],
        progress: &dyn BatchProgressCallback,
    ) -> Result<Vec<PathBuf>, Cv2DocError> {
        let total = inputs.len();
        progress.on_batch_start(total);

        let mut outputs = Vec::with_capacity(total);
        for (i, input) in inputs.iter().enumerate() {
            progress.on_file_start(i + 1, total, input);
            let output = self.run_processing(input).await?;
            progress.on_file_complete(i + 1, total, input, &output);
            outputs.push(output);
        }

        progress.on_batch_complete(total);
        Ok(outputs)
    }
}

/// One-shot helper: build a default [`Pipeline`] and process a single file.
pub async fn run_processing(pdf_path: &Path, settings: &Settings) -> Result<PathBuf, Cv2DocError> {
    Pipeline::from_settings(settings.clone())?
        .run_processing(pdf_path)
        .await
}

/// Write `bytes` to `path` through a sibling temp file, creating parents.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Cv2DocError> {
    let write_failed = |source: std::io::Error| Cv2DocError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_failed)?;

    let mut tmp = output_staging_file(parent).map_err(write_failed)?;
    tmp.write_all(bytes).map_err(write_failed)?;
    tmp.persist(path).map_err(|e| write_failed(e.error))?;
    Ok(())
}
