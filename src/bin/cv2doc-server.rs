//! HTTP server binary for cv2doc.
//!
//! Loads settings once at startup, then serves [`cv2doc::service::router`].

use anyhow::{Context, Result};
use clap::Parser;
use cv2doc::{service, Pipeline, Settings};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Serve resume conversion over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "cv2doc-server",
    version,
    about = "HTTP service converting uploaded resume PDFs into Word documents"
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "CV2DOC_LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    listen: SocketAddr,

    /// Load settings from this .env file instead of ./.env.
    #[arg(long, env = "CV2DOC_ENV_FILE")]
    env_file: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, env = "CV2DOC_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else {
        "info,tower_http=debug"
    };
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
    info!(
        "Model {} via {}, templates from {}",
        settings.model,
        settings.base_url,
        settings.template_path.display()
    );
    let pipeline = Pipeline::from_settings(settings).context("Failed to set up the pipeline")?;
    let app = service::router(pipeline);

    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("Cannot listen on {}", cli.listen))?;
    info!("Listening on http://{}", cli.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
