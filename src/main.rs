//! chiv - archive database tables to object storage
//!
//! # Usage
//!
//! ```bash
//! # Export a table as CSV into ~/.chiv/store/backups/orders.csv
//! chiv export --database sqlite://shop.db --table orders --bucket backups
//!
//! # Read the connection string from DATABASE_URL and export as YAML
//! DATABASE_URL=postgres://localhost/shop chiv export -t orders -b backups -f yaml
//!
//! # Export as JSON to an HTTP object store under an explicit key
//! chiv export -t orders -b backups -f json -k 2024/orders.json --endpoint http://localhost:9000
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use chiv::Archiver;
use chiv::cli::{CliInterface, ExportArgs};
use chiv::config::StoreKind;
use chiv::error::{ChivError, ConfigError, Result};
use chiv::upload::{FsUploader, HttpUploader, Uploader};

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Handle informational subcommands or run the export
///
/// # Returns
/// * `Result<()>` - Success or error
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    if cli.handle_subcommand()? {
        return Ok(());
    }

    match cli.export_args() {
        Some(args) => run_export(&cli, args).await,
        None => Ok(()),
    }
}

/// Run one export, cancelling it on Ctrl+C
async fn run_export(cli: &CliInterface, args: &ExportArgs) -> Result<()> {
    let config = cli.config();
    config.validate()?;

    let driver = config.driver()?;
    debug!("Connecting with the {} driver", driver);
    let executor = driver
        .connect(&config.database.url, config.database.max_connections)
        .await?;
    let uploader = build_uploader(cli)?;

    let archiver = Archiver::new(executor, uploader)
        .configure(&cli.export_options())
        .with_progress(args.progress && !cli.args().quiet);

    let cancel_token = CancellationToken::new();
    let cancel_token_clone = cancel_token.clone();
    let ctrl_c_handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                cancel_token_clone.cancel();
            }
            Err(err) => {
                eprintln!("Failed to listen for Ctrl+C: {}", err);
            }
        }
    });

    let result = archiver
        .export_with_cancellation(&args.table, &args.bucket, &[], cancel_token)
        .await;
    ctrl_c_handle.abort();

    let summary = result?;
    info!(
        "Exported {} rows ({} bytes) to {}/{}",
        summary.records, summary.bytes, args.bucket, summary.key
    );
    if !cli.args().quiet {
        println!(
            "{} rows written to {}/{}",
            summary.records, args.bucket, summary.key
        );
    }
    Ok(())
}

/// Build the uploader selected by the store configuration
fn build_uploader(cli: &CliInterface) -> Result<Arc<dyn Uploader>> {
    let store = &cli.config().store;
    match store.kind {
        StoreKind::Fs => {
            debug!("Using filesystem store at {}", store.root.display());
            Ok(Arc::new(FsUploader::new(store.root.clone())))
        }
        StoreKind::Http => {
            let endpoint = store
                .endpoint
                .clone()
                .ok_or_else(|| ConfigError::MissingField("store.endpoint".to_string()))?;
            debug!("Using HTTP store at {}", endpoint);
            let uploader = HttpUploader::new(&endpoint, cli.config().store_timeout())
                .map_err(|e| ChivError::Generic(format!("Failed to set up HTTP store: {e}")))?;
            Ok(Arc::new(uploader))
        }
    }
}

/// Initialize logging system based on the effective log level
///
/// # Arguments
/// * `cli` - CLI interface with the merged configuration
fn initialize_logging(cli: &CliInterface) {
    let level = cli.config().logging.level.to_tracing_level();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
