//! Bulk downloader: the download worker pool and its entry points.
//!
//! - [`worker`] - per-item session handling and local file writing
//!
//! Decompression of downloaded archives lives in [`crate::extraction`] and is
//! exposed here through [`FtpDownloader::decompress`] so both stages share one
//! event channel and one cancellation token.

mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use crate::config::{ExtractionConfig, TransferConfig};
use crate::error::{Result, TransferError};
use crate::extraction;
use crate::pool::run_pool;
use crate::transport::{FtpTransport, Transport};
use crate::types::{CompressionJob, DecompressReport, Event, ItemFailure, TransferReport};
use crate::utils::ensure_dir;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use worker::WorkerContext;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Concurrent bulk downloader (cloneable - all fields are shared)
#[derive(Clone)]
pub struct FtpDownloader {
    /// Transfer configuration, fixed for the lifetime of the downloader
    config: Arc<TransferConfig>,
    /// Session factory used by every worker
    transport: Arc<dyn Transport>,
    /// Event broadcast channel sender (multiple subscribers supported)
    event_tx: broadcast::Sender<Event>,
    /// Cancels the download and decompression pools
    cancel_token: CancellationToken,
}

impl FtpDownloader {
    /// Create a downloader that talks FTP
    ///
    /// Fails with [`crate::Error::Config`] if the configuration is invalid.
    pub fn new(config: TransferConfig) -> Result<Self> {
        Self::with_transport(config, Arc::new(FtpTransport::new()))
    }

    /// Create a downloader with a custom session transport
    pub fn with_transport(config: TransferConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            config: Arc::new(config),
            transport,
            event_tx,
            cancel_token: CancellationToken::new(),
        })
    }

    /// The transfer configuration
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Subscribe to download and decompression events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Abort running pools: workers stop taking new items and in-flight copies
    /// stop at the next chunk. Affected items are reported as cancelled.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Whether [`FtpDownloader::cancel`] has been called
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Download every configured file into the destination directory.
    ///
    /// The destination directory is created first (an existing directory is
    /// fine). Then a producer and exactly `max_connections` workers run
    /// concurrently; each worker opens its own session for every file it takes.
    /// Returns once the producer and all workers have finished.
    ///
    /// Two different remote names with the same base name would write the same
    /// local file; only the first is fetched and the others fail with
    /// [`TransferError::LocalIo`].
    ///
    /// Per-file failures do not stop the batch: they are collected in the
    /// returned [`TransferReport`], which accounts for every configured file
    /// exactly once. An `Err` means nothing was attempted.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ftp_dl::{FtpDownloader, TransferConfig};
    ///
    /// # async fn example() -> ftp_dl::Result<()> {
    /// let config = TransferConfig::new(
    ///     "ftp.example.org",
    ///     "/pub/data",
    ///     "downloads",
    ///     vec!["a.txt.gz".to_string(), "b.txt.gz".to_string()],
    /// );
    /// let report = FtpDownloader::new(config)?.download().await?;
    /// for failure in &report.failed {
    ///     eprintln!("{}: {}", failure.item, failure.error);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn download(&self) -> Result<TransferReport> {
        ensure_dir(&self.config.dest_dir).await?;

        info!(
            address = %self.config.server.address(),
            files = self.config.files.len(),
            workers = self.config.max_connections,
            "starting download"
        );

        let ctx = Arc::new(WorkerContext {
            config: Arc::clone(&self.config),
            transport: Arc::clone(&self.transport),
            event_tx: self.event_tx.clone(),
            cancel_token: self.cancel_token.clone(),
        });

        let (fetchable, collisions) =
            worker::partition_local_names(&self.config.files, &self.config.dest_dir);
        for collision in &collisions {
            warn!(file = %collision.item, error = %collision.error, "local name collision");
            self.event_tx
                .send(Event::DownloadFailed {
                    file: collision.item.clone(),
                    error: collision.error.to_string(),
                })
                .ok();
        }

        let outcomes = run_pool(
            fetchable,
            self.config.max_connections,
            &self.cancel_token,
            move |index, remote_name| worker::handle_item(Arc::clone(&ctx), index, remote_name),
            |remote_name| {
                Err(ItemFailure {
                    item: remote_name,
                    error: TransferError::Cancelled,
                })
            },
        )
        .await;

        let mut report = TransferReport::from_outcomes(
            outcomes
                .into_iter()
                .chain(collisions.into_iter().map(Err)),
        );
        report.reconcile(
            &self.config.files,
            |done| &done.remote_name,
            || TransferError::Aborted {
                reason: "worker terminated before reporting".to_string(),
            },
        );

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "download finished"
        );
        self.event_tx
            .send(Event::BatchComplete {
                succeeded: report.succeeded.len(),
                failed: report.failed.len(),
            })
            .ok();

        Ok(report)
    }

    /// Decompress gzip archives in parallel, at most
    /// [`crate::config::MAX_DECOMPRESS_WORKERS`] at a time.
    ///
    /// Shares this downloader's event channel and cancellation token.
    pub async fn decompress<J>(
        &self,
        jobs: impl IntoIterator<Item = J>,
        config: &ExtractionConfig,
    ) -> DecompressReport
    where
        J: Into<CompressionJob>,
    {
        extraction::decompress_files(jobs, config, &self.cancel_token, &self.event_tx).await
    }
}
