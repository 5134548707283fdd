//! Completion barrier for a group of concurrent units

use crate::error::Error;
use std::future::Future;
use tokio::task::JoinSet;

/// Waits for every spawned unit to finish
///
/// Registration happens in [`CompletionBarrier::spawn`], so the registered
/// count always equals the number of units started, and each unit is
/// reported exactly once by [`CompletionBarrier::wait`], including units
/// that panicked.
pub struct CompletionBarrier<T> {
    units: JoinSet<T>,
    registered: usize,
}

impl<T: Send + 'static> Default for CompletionBarrier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> CompletionBarrier<T> {
    /// Create an empty barrier
    pub fn new() -> Self {
        Self {
            units: JoinSet::new(),
            registered: 0,
        }
    }

    /// Register and start a unit
    pub fn spawn<F>(&mut self, unit: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.units.spawn(unit);
        self.registered += 1;
    }

    /// Number of units registered so far
    pub fn registered(&self) -> usize {
        self.registered
    }

    /// Block until every registered unit has finished.
    ///
    /// Returns one entry per unit, in completion order. A unit that panicked
    /// or was aborted yields [`Error::TaskFailed`].
    pub async fn wait(mut self) -> Vec<Result<T, Error>> {
        let mut finished = Vec::with_capacity(self.registered);
        while let Some(joined) = self.units.join_next().await {
            finished.push(joined.map_err(|e| Error::TaskFailed(e.to_string())));
        }
        finished
    }
}
