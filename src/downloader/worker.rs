//! Per-item download: open a session, retrieve one remote file, write it locally.

use crate::config::TransferConfig;
use crate::error::TransferError;
use crate::transport::{SessionGuard, Transport};
use crate::types::{DownloadedFile, Event, ItemFailure, TransferOutcome};
use crate::utils::local_file_name;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// State shared read-only by every download worker
pub(super) struct WorkerContext {
    pub(super) config: Arc<TransferConfig>,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) event_tx: broadcast::Sender<Event>,
    pub(super) cancel_token: CancellationToken,
}

/// Handle one dequeued file name and report its outcome.
///
/// The blocking session work runs on the blocking thread pool; a panic there
/// is turned into a failure of this item only.
pub(super) async fn handle_item(
    ctx: Arc<WorkerContext>,
    worker: usize,
    remote_name: String,
) -> TransferOutcome {
    info!(worker, file = %remote_name, "downloading file");
    ctx.event_tx
        .send(Event::Downloading {
            file: remote_name.clone(),
        })
        .ok();

    let result = {
        let ctx = Arc::clone(&ctx);
        let remote_name = remote_name.clone();
        tokio::task::spawn_blocking(move || {
            fetch_file(
                ctx.transport.as_ref(),
                &ctx.config,
                &remote_name,
                &ctx.cancel_token,
            )
        })
        .await
        .unwrap_or_else(|e| {
            Err(TransferError::Aborted {
                reason: format!("transfer task panicked: {}", e),
            })
        })
    };

    match result {
        Ok(done) => {
            info!(
                worker,
                file = %remote_name,
                path = %done.local_path.display(),
                bytes = done.bytes,
                "downloaded file"
            );
            ctx.event_tx
                .send(Event::Downloaded {
                    file: remote_name,
                    path: done.local_path.clone(),
                    bytes: done.bytes,
                })
                .ok();
            Ok(done)
        }
        Err(error) => {
            warn!(worker, file = %remote_name, error = %error, "download failed");
            ctx.event_tx
                .send(Event::DownloadFailed {
                    file: remote_name.clone(),
                    error: error.to_string(),
                })
                .ok();
            Err(ItemFailure {
                item: remote_name,
                error,
            })
        }
    }
}

/// Split the batch into files that may be fetched and files whose local name
/// is already taken by an earlier, different remote name.
///
/// Local names are remote base names, so `x/data.txt` and `y/data.txt` would
/// both land on `dest_dir/data.txt`. The first one keeps the name; each later
/// one fails with `LocalIo` (`AlreadyExists`) without being fetched. Repeats
/// of the same remote name are kept. Names with no usable base name are left
/// for [`fetch_file`] to reject.
pub(super) fn partition_local_names(
    files: &[String],
    dest_dir: &Path,
) -> (Vec<String>, Vec<ItemFailure<String, TransferError>>) {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    let mut accepted = Vec::with_capacity(files.len());
    let mut collisions = Vec::new();

    for remote_name in files {
        let Ok(base) = local_file_name(remote_name) else {
            accepted.push(remote_name.clone());
            continue;
        };
        match owners.get(base) {
            Some(&owner) if owner != remote_name.as_str() => {
                collisions.push(ItemFailure {
                    item: remote_name.clone(),
                    error: TransferError::LocalIo {
                        path: dest_dir.join(base),
                        source: std::io::Error::new(
                            std::io::ErrorKind::AlreadyExists,
                            format!("local file name '{base}' is already used by '{owner}'"),
                        ),
                    },
                });
            }
            Some(_) => accepted.push(remote_name.clone()),
            None => {
                owners.insert(base, remote_name);
                accepted.push(remote_name.clone());
            }
        }
    }

    (accepted, collisions)
}

/// Download a single remote file into the destination directory.
///
/// A fresh session is opened for the file and closed before returning, on
/// success and on every error path.
pub(crate) fn fetch_file(
    transport: &dyn Transport,
    config: &TransferConfig,
    remote_name: &str,
    cancel: &CancellationToken,
) -> Result<DownloadedFile, TransferError> {
    let local_path = config.dest_dir.join(local_file_name(remote_name)?);

    if cancel.is_cancelled() {
        return Err(TransferError::Cancelled);
    }

    let mut session = SessionGuard::new(transport.connect(&config.server, config.connect_timeout)?);
    debug!(address = %config.server.address(), "session opened");

    session.login(&config.server.username, &config.server.password)?;
    session.change_dir(&config.base_dir)?;

    let mut sink = LocalSink::new(local_path.clone(), cancel.clone());
    let bytes = match session.retrieve(remote_name, &mut sink) {
        Ok(bytes) => bytes,
        // A local write failure or cancellation surfaces from the transport as
        // a generic stream error; report the real cause.
        Err(e) => return Err(sink.take_failure().unwrap_or(e)),
    };
    sink.finish()?;

    Ok(DownloadedFile {
        remote_name: remote_name.to_string(),
        local_path,
        bytes,
    })
}

/// Local file written by a retrieval
///
/// The file is created on the first write (or on [`LocalSink::finish`] for an
/// empty remote file), so a retrieval that fails before any data arrives
/// leaves nothing behind. Writes fail once `cancel` fires.
pub(crate) struct LocalSink {
    path: PathBuf,
    file: Option<BufWriter<File>>,
    cancel: CancellationToken,
    failure: Option<TransferError>,
}

impl LocalSink {
    pub(crate) fn new(path: PathBuf, cancel: CancellationToken) -> Self {
        Self {
            path,
            file: None,
            cancel,
            failure: None,
        }
    }

    /// The first local failure recorded by a write, if any
    pub(crate) fn take_failure(&mut self) -> Option<TransferError> {
        self.failure.take()
    }

    /// Create the file if nothing was written yet, then flush it to disk
    pub(crate) fn finish(mut self) -> Result<(), TransferError> {
        self.open()
            .and_then(|file| file.flush())
            .map_err(|source| local_io(&self.path, source))
    }

    fn open(&mut self) -> std::io::Result<&mut BufWriter<File>> {
        if self.file.is_none() {
            self.file = Some(BufWriter::new(File::create(&self.path)?));
        }
        self.file
            .as_mut()
            .ok_or_else(|| std::io::Error::other("local file not open"))
    }

    fn record(&mut self, failure: TransferError) -> std::io::Error {
        let err = std::io::Error::other(failure.to_string());
        self.failure.get_or_insert(failure);
        err
    }
}

impl Write for LocalSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(self.record(TransferError::Cancelled));
        }
        match self.open().and_then(|file| file.write(buf)) {
            Ok(n) => Ok(n),
            Err(source) => {
                let failure = local_io(&self.path, source);
                Err(self.record(failure))
            }
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

fn local_io(path: &Path, source: std::io::Error) -> TransferError {
    TransferError::LocalIo {
        path: path.to_path_buf(),
        source,
    }
}
