//! CLI binary for cv2doc.
//!
//! Resolves the input path to a list of resumes and runs the pipeline on
//! each, in order. The first failure aborts the batch with a non-zero exit.

use anyhow::{Context, Result};
use clap::Parser;
use cv2doc::{collect_pdfs, BatchProgressCallback, NoopProgressCallback, Pipeline, Settings};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────

/// Progress bar over the batch, with one log line per resume.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} CVs  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold("Starting CV to Document conversion...")
        ));
    }

    fn on_file_start(&self, _index: usize, _total: usize, input: &Path) {
        let name = display_name(input);
        self.bar
            .println(format!("  Processing CV: {}", bold(&name)));
        self.bar.set_message(name);
    }

    fn on_file_complete(&self, _index: usize, _total: usize, _input: &Path, output: &Path) {
        self.bar.println(format!(
            "  {} Processing CV completed. {}",
            green("✓"),
            dim(&output.display().to_string())
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} Conversion completed. {} document(s) written",
            green("✔"),
            bold(&total.to_string())
        );
    }
}

/// Convert resume PDFs into filled Word documents.
#[derive(Parser, Debug)]
#[command(
    name = "cv2doc",
    version,
    about = "Convert resume PDFs into filled Word documents using a vision LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// A resume PDF, or a directory whose .pdf files are all converted.
    path: PathBuf,

    /// Load settings from this .env file instead of ./.env.
    #[arg(long, env = "CV2DOC_ENV_FILE")]
    env_file: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, env = "CV2DOC_VERBOSE")]
    verbose: bool,

    /// Print nothing but errors.
    #[arg(short, long, env = "CV2DOC_QUIET")]
    quiet: bool,
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One resume
  cv2doc cv/jane.pdf

  # Every .pdf in a directory (not recursive)
  cv2doc cv/

ENVIRONMENT VARIABLES:
  AI_API_KEY               Gemini API key (required)
  PROMPT_PATH              Prompt template; {date} becomes today's date (required)
  JSON_OUTPUT_DIR          Where {stem}.json records are written (required)
  RESULTS_DIR              Where {stem}.docx documents are written (required)
  DOX_TEMPLATE_PATH        The .docx template (required)
  AI_MODEL                 Model id (default gemini-3-flash-preview)
  AI_BASE_URL              generateContent API base URL
  AI_REQUEST_TIMEOUT_SECS  Per-call timeout (default 120)
  PDFIUM_LIB_PATH          pdfium library file or directory (default: system library)
"#;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar carries the user-facing output; library logs stay
    // at error level unless --verbose is given.
    let filter = if cli.verbose { "debug" } else { "error" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    let settings = Settings::from_env().context("Invalid configuration")?;
    let inputs = collect_pdfs(&cli.path)
        .with_context(|| format!("No resume to process at {}", cli.path.display()))?;
    let pipeline = Pipeline::from_settings(settings).context("Failed to set up the pipeline")?;

    let result = if cli.quiet {
        pipeline.run_batch(&inputs, &NoopProgressCallback).await
    } else {
        let progress = CliProgressCallback::new();
        let result = pipeline.run_batch(&inputs, &progress).await;
        if result.is_err() {
            progress.bar.abandon();
        }
        result
    };
    let outputs = result.context("Conversion failed")?;
    tracing::debug!("{} document(s) written", outputs.len());

    Ok(())
}
