//! Bounded worker pool shared by the download and decompression stages.
//!
//! - [`queue`] - work queue with an explicit closed signal
//! - [`barrier`] - waits for the producer and every worker
//!
//! [`run_pool`] starts one producer and a fixed number of workers. Workers pull
//! items until the queue is closed and empty (or the pool is cancelled), so at
//! most `workers` items are ever in flight.

mod barrier;
mod queue;

pub use barrier::CompletionBarrier;
pub use queue::{WorkProducer, WorkQueue, work_queue};

use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Process `items` with exactly `workers` concurrent workers.
///
/// `handler(worker_index, item)` runs for every dequeued item. Items that are
/// never handled because the pool was cancelled are passed to `on_cancel`
/// instead, so one outcome is produced per item unless a worker task itself
/// dies (its in-flight outcome is lost and logged; callers reconcile).
pub(crate) async fn run_pool<I, O, H, Fut, C>(
    items: Vec<I>,
    workers: usize,
    cancel: &CancellationToken,
    handler: H,
    on_cancel: C,
) -> Vec<O>
where
    I: Send + 'static,
    O: Send + 'static,
    H: Fn(usize, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send + 'static,
    C: Fn(I) -> O + Send + Sync + 'static,
{
    let (producer, queue) = work_queue();
    let handler = Arc::new(handler);
    let on_cancel = Arc::new(on_cancel);
    let mut barrier = CompletionBarrier::new();

    // Producer runs alongside the workers so the first worker starts right away
    {
        let cancel = cancel.clone();
        let on_cancel = Arc::clone(&on_cancel);
        barrier.spawn(async move {
            producer
                .enqueue_all(items, &cancel)
                .into_iter()
                .map(|item| on_cancel(item))
                .collect::<Vec<O>>()
        });
    }

    for worker in 0..workers {
        let queue = queue.clone();
        let cancel = cancel.clone();
        let handler = Arc::clone(&handler);
        barrier.spawn(async move {
            let mut outcomes = Vec::new();
            while let Some(item) = queue.next(&cancel).await {
                outcomes.push(handler(worker, item).await);
            }
            debug!(worker, handled = outcomes.len(), "worker exiting");
            outcomes
        });
    }

    let mut outcomes = Vec::new();
    for unit in barrier.wait().await {
        match unit {
            Ok(produced) => outcomes.extend(produced),
            Err(e) => error!(error = %e, "pool unit terminated abnormally"),
        }
    }

    // Only non-empty after cancellation, or if every worker died
    outcomes.extend(queue.drain().await.into_iter().map(|item| on_cancel(item)));
    outcomes
}
