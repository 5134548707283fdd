//! Parallel gzip decompression
//!
//! A bounded pool of at most [`MAX_DECOMPRESS_WORKERS`] workers pulls
//! [`CompressionJob`]s from a shared queue, the same structure the download
//! pool uses. A malformed archive fails only its own job.

mod gzip;


pub use gzip::gzip_decompress;

use crate::config::{ExtractionConfig, MAX_DECOMPRESS_WORKERS};
use crate::error::DecompressError;
use crate::pool::run_pool;
use crate::types::{
    CompressionJob, DecompressOutcome, DecompressReport, DecompressedFile, Event, ItemFailure,
};
use std::path::PathBuf;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Decompress every job, running at most `config.effective_workers(..)`
/// decompressions at once.
///
/// Accepts anything convertible to [`CompressionJob`], including a map of
/// compressed source to destination path. Returns once every job has
/// finished; each job appears exactly once in the report.
///
/// # Example
///
/// ```no_run
/// use ftp_dl::config::ExtractionConfig;
/// use ftp_dl::extraction::decompress_files;
/// use std::collections::HashMap;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() {
/// let jobs = HashMap::from([("a.txt.gz", "a.txt"), ("b.txt.gz", "b.txt")]);
/// let (events, _) = tokio::sync::broadcast::channel(16);
/// let report = decompress_files(
///     jobs,
///     &ExtractionConfig::default(),
///     &CancellationToken::new(),
///     &events,
/// )
/// .await;
/// assert_eq!(report.len(), 2);
/// # }
/// ```
pub async fn decompress_files<J>(
    jobs: impl IntoIterator<Item = J>,
    config: &ExtractionConfig,
    cancel: &CancellationToken,
    event_tx: &broadcast::Sender<Event>,
) -> DecompressReport
where
    J: Into<CompressionJob>,
{
    let jobs: Vec<CompressionJob> = jobs.into_iter().map(Into::into).collect();
    let workers = config.effective_workers(jobs.len());
    if config.max_workers > MAX_DECOMPRESS_WORKERS {
        warn!(
            requested = config.max_workers,
            cap = MAX_DECOMPRESS_WORKERS,
            "decompression workers capped"
        );
    }
    info!(jobs = jobs.len(), workers, "starting decompression");

    let sources: Vec<PathBuf> = jobs.iter().map(|job| job.source.clone()).collect();
    let worker_cancel = cancel.clone();
    let worker_events = event_tx.clone();
    let outcomes = run_pool(
        jobs,
        workers,
        cancel,
        move |_, job| handle_job(job, worker_cancel.clone(), worker_events.clone()),
        |job: CompressionJob| {
            Err(ItemFailure {
                item: job.source,
                error: DecompressError::Cancelled,
            })
        },
    )
    .await;

    let mut report = DecompressReport::from_outcomes(outcomes);
    report.reconcile(
        &sources,
        |done| &done.source,
        || DecompressError::Aborted {
            reason: "worker terminated before reporting".to_string(),
        },
    );

    info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "decompression finished"
    );
    event_tx
        .send(Event::BatchComplete {
            succeeded: report.succeeded.len(),
            failed: report.failed.len(),
        })
        .ok();

    report
}

async fn handle_job(
    job: CompressionJob,
    cancel: CancellationToken,
    event_tx: broadcast::Sender<Event>,
) -> DecompressOutcome {
    info!(source = %job.source.display(), "decompressing file");
    event_tx
        .send(Event::Decompressing {
            source: job.source.clone(),
        })
        .ok();

    let result = {
        let source = job.source.clone();
        let destination = job.destination.clone();
        tokio::task::spawn_blocking(move || {
            gzip::decompress_gzip_file(&source, &destination, &cancel)
        })
        .await
        .unwrap_or_else(|e| {
            Err(DecompressError::Aborted {
                reason: format!("decompression task panicked: {}", e),
            })
        })
    };

    match result {
        Ok(bytes) => {
            info!(
                source = %job.source.display(),
                destination = %job.destination.display(),
                bytes,
                "decompressed file"
            );
            event_tx
                .send(Event::Decompressed {
                    source: job.source.clone(),
                    destination: job.destination.clone(),
                    bytes,
                })
                .ok();
            Ok(DecompressedFile {
                source: job.source,
                destination: job.destination,
                bytes,
            })
        }
        Err(error) => {
            warn!(source = %job.source.display(), error = %error, "decompression failed");
            event_tx
                .send(Event::DecompressFailed {
                    source: job.source.clone(),
                    error: error.to_string(),
                })
                .ok();
            Err(ItemFailure {
                item: job.source,
                error,
            })
        }
    }
}
