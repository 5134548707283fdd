//! Core types for ftp-dl

use crate::error::{DecompressError, TransferError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::path::PathBuf;

/// A remote file that was written to the destination directory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadedFile {
    /// Remote file name as listed in the transfer configuration
    pub remote_name: String,
    /// Local path the file was written to
    pub local_path: PathBuf,
    /// Number of bytes written
    pub bytes: u64,
}

/// An archive that was decompressed to its destination
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompressedFile {
    /// Compressed source path
    pub source: PathBuf,
    /// Decompressed destination path
    pub destination: PathBuf,
    /// Number of decompressed bytes written
    pub bytes: u64,
}

/// One compressed source and the path its decompressed content goes to
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompressionJob {
    /// Compressed source path
    pub source: PathBuf,
    /// Decompressed destination path (created if absent, truncated otherwise)
    pub destination: PathBuf,
}

impl CompressionJob {
    /// Create a job decompressing `source` into `destination`
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

impl<S, D> From<(S, D)> for CompressionJob
where
    S: Into<PathBuf>,
    D: Into<PathBuf>,
{
    fn from((source, destination): (S, D)) -> Self {
        CompressionJob::new(source, destination)
    }
}

/// A work item that failed, together with its error
#[derive(Debug)]
pub struct ItemFailure<K, E> {
    /// The work item (remote file name or compressed source path)
    pub item: K,
    /// Why it failed
    pub error: E,
}

/// Per-item outcome of a batch: every work item ends up in exactly one of
/// `succeeded` or `failed`.
#[derive(Debug)]
pub struct BatchReport<T, K, E> {
    /// Items that completed
    pub succeeded: Vec<T>,
    /// Items that failed, with their errors
    pub failed: Vec<ItemFailure<K, E>>,
}

/// Report of a bulk download
pub type TransferReport = BatchReport<DownloadedFile, String, TransferError>;

/// Report of a parallel decompression
pub type DecompressReport = BatchReport<DecompressedFile, PathBuf, DecompressError>;

/// Per-item outcome produced by a download worker
pub(crate) type TransferOutcome = Result<DownloadedFile, ItemFailure<String, TransferError>>;

/// Per-item outcome produced by a decompression worker
pub(crate) type DecompressOutcome = Result<DecompressedFile, ItemFailure<PathBuf, DecompressError>>;

impl<T, K, E> Default for BatchReport<T, K, E> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T, K, E> BatchReport<T, K, E> {
    /// Build a report from per-item outcomes
    pub fn from_outcomes(
        outcomes: impl IntoIterator<Item = Result<T, ItemFailure<K, E>>>,
    ) -> Self {
        let mut report = Self::default();
        for outcome in outcomes {
            match outcome {
                Ok(done) => report.succeeded.push(done),
                Err(failure) => report.failed.push(failure),
            }
        }
        report
    }

    /// True when no item failed
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total number of items accounted for
    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// True when the batch had no items
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a failure for every expected item the report does not account for.
    ///
    /// `key_of` extracts the work item from a success. Items are counted as a
    /// multiset, so duplicated inputs must be accounted for once each.
    pub(crate) fn reconcile<'a, I>(
        &mut self,
        expected: I,
        key_of: impl Fn(&T) -> &K,
        mut missing: impl FnMut() -> E,
    ) where
        I: IntoIterator<Item = &'a K>,
        K: Eq + Hash + Clone + 'a,
    {
        let mut outstanding: HashMap<&K, usize> = HashMap::new();
        for key in expected {
            *outstanding.entry(key).or_default() += 1;
        }
        for key in self
            .succeeded
            .iter()
            .map(&key_of)
            .chain(self.failed.iter().map(|f| &f.item))
        {
            if let Some(count) = outstanding.get_mut(key) {
                *count = count.saturating_sub(1);
            }
        }

        let mut lost = Vec::new();
        for (key, count) in outstanding {
            for _ in 0..count {
                lost.push(ItemFailure {
                    item: key.clone(),
                    error: missing(),
                });
            }
        }
        self.failed.extend(lost);
    }
}

/// Event emitted while downloading or decompressing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A worker took a file off the queue and is opening a session for it
    Downloading {
        /// Remote file name
        file: String,
    },

    /// File was written to the destination directory
    Downloaded {
        /// Remote file name
        file: String,
        /// Local path
        path: PathBuf,
        /// Bytes written
        bytes: u64,
    },

    /// File could not be downloaded
    DownloadFailed {
        /// Remote file name
        file: String,
        /// Error message
        error: String,
    },

    /// A worker started decompressing an archive
    Decompressing {
        /// Compressed source path
        source: PathBuf,
    },

    /// Archive was decompressed
    Decompressed {
        /// Compressed source path
        source: PathBuf,
        /// Decompressed destination path
        destination: PathBuf,
        /// Decompressed bytes written
        bytes: u64,
    },

    /// Archive could not be decompressed
    DecompressFailed {
        /// Compressed source path
        source: PathBuf,
        /// Error message
        error: String,
    },

    /// A download or decompression batch finished
    BatchComplete {
        /// Number of items that succeeded
        succeeded: usize,
        /// Number of items that failed
        failed: usize,
    },
}
