//! CLI entry point for the concurrent segmented S3 object downloader.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use s3dl_core::cancellation::CancellationToken;
use s3dl_core::config::{Config, Credentials};
use s3dl_core::logging;
use s3dl_core::supervisor;
use s3dl_core::transport::{CurlTransport, Transport};

/// Downloads a single S3-compatible object over multiple concurrent
/// range-fetching connections, resuming from any scratch files already on
/// disk.
#[derive(Debug, Parser)]
#[command(name = "s3dl")]
struct Args {
    /// Load configuration from a TOML file; explicit flags below are ignored
    /// when this is given.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Bucket to fetch the object from.
    #[arg(long, required_unless_present = "config")]
    bucket: Option<String>,

    /// Object key within the bucket.
    #[arg(long, required_unless_present = "config")]
    object_key: Option<String>,

    /// Region passed to the transport.
    #[arg(long, default_value = "ap-east-1")]
    region: String,

    /// Optional S3-compatible endpoint override.
    #[arg(long)]
    endpoint: Option<String>,

    #[arg(long, default_value = "")]
    access_key_id: String,

    #[arg(long, default_value = "")]
    secret_access_key: String,

    #[arg(long)]
    session_token: Option<String>,

    /// Number of concurrent segment workers.
    #[arg(long, default_value = "10")]
    concurrency: usize,

    /// Directory the final file and scratch files are written under.
    #[arg(long, value_name = "DIR", default_value = "files")]
    download_dir: PathBuf,

    /// Log file name override (default: `download_log_<timestamp>.txt`).
    #[arg(long)]
    log_file_name: Option<String>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<Config> {
        if let Some(path) = self.config {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            return Config::from_toml_str(&text).context("parsing config file");
        }

        let mut cfg = Config {
            bucket: self.bucket.expect("required_unless_present=config"),
            region: self.region,
            endpoint: self.endpoint,
            credentials: Credentials {
                access_key_id: self.access_key_id,
                secret_access_key: self.secret_access_key,
                session_token: self.session_token,
            },
            concurrency: self.concurrency,
            download_dir: self.download_dir,
            object_key: self.object_key.expect("required_unless_present=config"),
            log_file_name: self.log_file_name,
        };
        cfg.normalize_object_key();
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("s3dl error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.into_config()?;

    match logging::init_logging(&config.download_dir, config.log_file_name.as_deref()) {
        Ok(path) => eprintln!("logging to {}", path.display()),
        Err(e) => {
            eprintln!("failed to open log file ({}), logging to stderr", e);
            logging::init_logging_stderr();
        }
    }

    let cancel = CancellationToken::new();
    let ctrlc_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("received interrupt, cancelling after in-flight writes settle");
            ctrlc_cancel.cancel();
        }
    });

    let transport: Arc<dyn Transport> = Arc::new(CurlTransport::new(
        &config.region,
        config.endpoint.as_deref(),
        config.credentials.clone(),
    ));

    let outcome = supervisor::run(&config, transport, cancel).await?;

    match outcome {
        supervisor::DownloadOutcome::Completed(report) => {
            println!(
                "downloaded {} bytes to {} in {:.1}s ({:.2} MiB/s, {} segments, {} retries, {} max per segment)",
                report.total_size,
                report.final_path.display(),
                report.elapsed.as_secs_f64(),
                report.avg_speed / (1024.0 * 1024.0),
                report.segment_count,
                report.total_retries,
                report.max_retries,
            );
        }
        supervisor::DownloadOutcome::Cancelled(report) => {
            println!(
                "cancelled after {} / {} bytes in {:.1}s ({} segments, {} retries, {} max per segment); scratch files preserved for resume",
                report.total_downloaded,
                report.total_size,
                report.elapsed.as_secs_f64(),
                report.segment_count,
                report.total_retries,
                report.max_retries,
            );
            std::process::exit(0);
        }
    }

    Ok(())
}
