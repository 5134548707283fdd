//! # ftp-dl
//!
//! Concurrent bulk downloads from FTP servers, with bounded parallel gzip
//! decompression of the results.
//!
//! ## Design
//!
//! - **Bounded worker pool** - a producer feeds remote file names into a shared
//!   queue; exactly `max_connections` workers drain it, each opening its own
//!   session per file
//! - **Failures stay per item** - a file or archive that fails is reported in
//!   the batch report, the rest of the batch carries on
//! - **Guaranteed release** - sessions are closed on every exit path
//! - **Cancellable** - one token stops both pools cleanly
//! - **Event-driven** - consumers subscribe to progress events
//!
//! ## Quick Start
//!
//! ```no_run
//! use ftp_dl::{ExtractionConfig, FtpDownloader, TransferConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TransferConfig::new(
//!         "ftp.example.org",
//!         "/pub/annotations",
//!         "downloads",
//!         vec!["genes.gtf.gz".to_string(), "proteins.fa.gz".to_string()],
//!     );
//!
//!     let downloader = FtpDownloader::new(config)?;
//!
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = downloader.download().await?;
//!     println!("{} downloaded, {} failed", report.succeeded.len(), report.failed.len());
//!
//!     let jobs = report
//!         .succeeded
//!         .iter()
//!         .map(|f| (f.local_path.clone(), f.local_path.with_extension("")));
//!     let unpacked = downloader.decompress(jobs, &ExtractionConfig::default()).await;
//!     assert!(unpacked.all_succeeded());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Bulk downloader and download worker pool
pub mod downloader;
/// Error types
pub mod error;
/// Parallel gzip decompression
pub mod extraction;
/// Single-file HTTP download
pub mod http;
/// Work queue, completion barrier and bounded pool
pub mod pool;
/// File-transfer sessions
pub mod transport;
/// Core types, reports and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{ExtractionConfig, ServerConfig, TransferConfig};
pub use downloader::FtpDownloader;
pub use error::{DecompressError, Error, Result, TransferError};
pub use transport::{FtpTransport, Session, SessionGuard, Transport};
pub use types::{
    BatchReport, CompressionJob, DecompressReport, DecompressedFile, DownloadedFile, Event,
    ItemFailure, TransferReport,
};

/// Helper to run a download with graceful signal handling.
///
/// Runs [`FtpDownloader::download`] and cancels it when a termination signal
/// arrives. Cancelled files are reported as failed with
/// [`TransferError::Cancelled`].
///
/// - **Unix:** listens for SIGTERM and SIGINT.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn download_with_shutdown(downloader: &FtpDownloader) -> Result<TransferReport> {
    let download = downloader.download();
    tokio::pin!(download);

    tokio::select! {
        report = &mut download => report,
        _ = wait_for_signal() => {
            downloader.cancel();
            download.await
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
