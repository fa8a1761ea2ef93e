use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use ingest_client::config::loader::{load_config, load_config_from};
use ingest_client::{
    IngestError, IngestResult, ProgressReporter, SourceFile, UploadOrchestrator, extract_file,
};

#[derive(Parser)]
#[command(name = "ingest-client")]
#[command(about = "Upload a file and ingest its text into the document store", long_about = None)]
#[command(version)]
struct Cli {
    /// File to ingest
    path: PathBuf,

    /// Declared content type (inferred from the extension when omitted)
    #[arg(long)]
    content_type: Option<String>,

    /// Maximum number of part uploads in flight
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Only run text extraction and print the result
    #[arg(long)]
    extract_only: bool,

    /// Configuration file name (extension optional)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.code(), error = %e, "Ingestion failed");
            let mut message = e.to_string();
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                message.push_str(&format!(": {}", cause));
                source = cause.source();
            }
            eprintln!("error [{}]: {}", e.code(), message);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> IngestResult<()> {
    let config = match &cli.config {
        Some(name) => load_config_from(name)?,
        None => load_config()?,
    };

    let source = match &cli.content_type {
        Some(content_type) => SourceFile::open(&cli.path, content_type.as_str()).await?,
        None => SourceFile::open_inferred(&cli.path).await?,
    };
    info!(
        file = %source.name(),
        content_type = %source.content_type(),
        size = source.size(),
        "Source file opened"
    );

    let progress = ProgressReporter::new();
    let watcher = watch_progress(&progress);

    let output = if cli.extract_only {
        let result = extract_file(&source, &progress.band(0.0, 100.0)).await?;
        to_json(&result)?
    } else {
        let cancel = CancellationToken::new();
        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling after in-flight parts");
                ctrl_c.cancel();
            }
        });

        let orchestrator = UploadOrchestrator::from_config(&config, progress.clone())?;
        let document = orchestrator
            .ingest(&source, cli.concurrency, cancel)
            .await?;
        to_json(&document)?
    };

    watcher.abort();
    println!("{}", output);
    Ok(())
}

/// Log every change of the progress record until aborted
fn watch_progress(progress: &ProgressReporter) -> tokio::task::JoinHandle<()> {
    let mut rx = progress.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let record = rx.borrow_and_update().clone();
            info!(
                status = %record.status,
                progress = record.progress,
                "Progress"
            );
        }
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> IngestResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| IngestError::Internal {
        message: format!("Failed to serialize output: {}", e),
    })
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Logs go to stderr so stdout carries only the JSON result
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ingest_client=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
