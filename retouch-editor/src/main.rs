//! # Retouch
//!
//! Headless batch editor: loads an image, runs a JSON edit script against
//! an editor session, and writes the export plus a JSON dump of the final
//! edit state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use retouch_ai::http::DEFAULT_MODEL;
use retouch_ai::{AiService, HttpImageService, OfflineService};
use retouch_core::ImageRef;
use retouch_editor::{
    buffer_from_file, parse_script, run_script, EditorConfig, EditorEvent, EditorSession,
};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for retouch.
#[derive(Debug, Clone, Parser)]
#[command(name = "retouch")]
#[command(about = "Apply an edit script to an image and export the result")]
#[command(version)]
struct CliArgs {
    /// Source image: a local path, an http(s) URL or a data URI
    #[arg(long)]
    input: String,

    /// JSON edit script to run before exporting
    #[arg(long)]
    script: Option<PathBuf>,

    /// Directory the export is written to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Image model endpoint (e.g., <https://generativelanguage.googleapis.com>)
    #[arg(long, env = "RETOUCH_AI_URL")]
    service_url: Option<String>,

    /// API key for the image model
    #[arg(long, env = "RETOUCH_AI_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name used when the service URL has no path
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// JSON editor configuration file
    #[arg(long, env = "RETOUCH_CONFIG")]
    config: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,retouch_editor=debug,retouch_ai=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    // Use JSON format in production (RUST_LOG_FORMAT=json)
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// Interpret `--input` as a URI when it looks like one, otherwise as a path.
fn load_input(input: &str) -> anyhow::Result<ImageRef> {
    if input.starts_with("http://") || input.starts_with("https://") || input.starts_with("data:") {
        return Ok(ImageRef::parse(input)?);
    }
    let buffer = buffer_from_file(Path::new(input))
        .with_context(|| format!("Failed to read input image {input}"))?;
    Ok(ImageRef::Resident(buffer))
}

fn build_service(args: &CliArgs) -> anyhow::Result<Arc<dyn AiService>> {
    match &args.service_url {
        Some(url) => {
            let service = HttpImageService::new(url, &args.model, args.api_key.clone())?;
            tracing::info!(endpoint = %service.endpoint(), "Using image service");
            Ok(Arc::new(service))
        }
        None => {
            tracing::warn!("No image service configured, background removal uses the local fallback");
            Ok(Arc::new(OfflineService))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let config = match &args.config {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EditorConfig::default(),
    };

    let source = load_input(&args.input)?;
    let service = build_service(&args)?;
    let session = EditorSession::new(source, service, &config);

    let mut events = session.subscribe();
    let reporter = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(EditorEvent::ProcessingStarted { message, .. }) => {
                    tracing::info!("{message}");
                }
                Ok(EditorEvent::RetryScheduled { message, .. }) => {
                    tracing::warn!("{message}");
                }
                Ok(event) => tracing::debug!(?event, "Session event"),
                Err(RecvError::Lagged(missed)) => tracing::warn!(missed, "Dropped session events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    if let Some(path) = &args.script {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        let steps = parse_script(&json)?;
        tracing::info!(steps = steps.len(), "Running edit script");
        run_script(&session, &steps).await?;
    }

    let artifact = session.export().await?;
    std::fs::create_dir_all(&args.output_dir)?;
    let export_path = artifact.write_to(&args.output_dir)?;

    let state_path = export_path.with_extension("json");
    std::fs::write(&state_path, session.state().to_json()?)?;
    tracing::debug!(path = %state_path.display(), "Edit state written");

    drop(session);
    reporter.await?;

    println!("{}", export_path.display());
    Ok(())
}
