//! Single-producer / multi-consumer work queue with an explicit end-of-input signal

use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

/// Create a connected producer and consumer handle
pub fn work_queue<T>() -> (WorkProducer<T>, WorkQueue<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        WorkProducer { tx },
        WorkQueue {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// The single writing end of a work queue
///
/// Dropping the producer closes the queue. Since [`WorkProducer::enqueue_all`]
/// consumes it, the queue is closed exactly once, after the last push.
pub struct WorkProducer<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> WorkProducer<T> {
    /// Push every item in order, then close the queue.
    ///
    /// Stops early if `cancel` fires and returns the items that were never
    /// pushed, so the caller can still account for them.
    pub fn enqueue_all(self, items: Vec<T>, cancel: &CancellationToken) -> Vec<T> {
        let mut items = items.into_iter();
        while let Some(item) = items.next() {
            if cancel.is_cancelled() {
                let mut unsent = vec![item];
                unsent.extend(items);
                return unsent;
            }
            if let Err(mpsc::error::SendError(item)) = self.tx.send(item) {
                // Every consumer handle is gone
                let mut unsent = vec![item];
                unsent.extend(items);
                return unsent;
            }
        }
        Vec::new()
    }
}

/// Shared reading end of a work queue, cloned into every worker
pub struct WorkQueue<T> {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<T>>>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<T> WorkQueue<T> {
    /// Wait for the next item.
    ///
    /// Returns `None` once the queue is closed and empty, or as soon as `cancel`
    /// fires. Pending until then, so an empty queue that is still open is never
    /// mistaken for the end of input.
    pub async fn next(&self, cancel: &CancellationToken) -> Option<T> {
        let mut rx = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            guard = self.rx.lock() => guard,
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            item = rx.recv() => item,
        }
    }

    /// Remove and return whatever is still buffered without waiting
    pub async fn drain(&self) -> Vec<T> {
        let mut rx = self.rx.lock().await;
        let mut left = Vec::new();
        while let Ok(item) = rx.try_recv() {
            left.push(item);
        }
        left
    }
}
