//! Shared test helpers: an in-memory transport and downloader factory.

use crate::config::{ServerConfig, TransferConfig};
use crate::downloader::FtpDownloader;
use crate::error::TransferError;
use crate::transport::{Session, Transport};
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{TempDir, tempdir};

/// Failure injected into every session a [`MockTransport`] opens
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Fault {
    None,
    Connect,
    Login,
    ChangeDir,
}

/// In-memory file server
///
/// Serves the files it was built with from a single remote directory and
/// records how sessions are used so tests can check connection bounds.
pub(crate) struct MockTransport {
    files: HashMap<String, Vec<u8>>,
    fault: Fault,
    /// Delay inside each retrieve, to make overlap observable
    retrieve_delay: Duration,
    dials: AtomicUsize,
    open: Arc<AtomicUsize>,
    peak_open: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    retrieved: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            files: HashMap::new(),
            fault: Fault::None,
            retrieve_delay: Duration::ZERO,
            dials: AtomicUsize::new(0),
            open: Arc::new(AtomicUsize::new(0)),
            peak_open: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
            retrieved: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Serve `body` under `name`
    pub(crate) fn with_file(mut self, name: &str, body: impl AsRef<[u8]>) -> Self {
        self.files.insert(name.to_string(), body.as_ref().to_vec());
        self
    }

    /// Serve every name with the same body
    pub(crate) fn with_files<'a>(
        self,
        names: impl IntoIterator<Item = &'a str>,
        body: &[u8],
    ) -> Self {
        names
            .into_iter()
            .fold(self, |transport, name| transport.with_file(name, body))
    }

    pub(crate) fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = fault;
        self
    }

    pub(crate) fn with_retrieve_delay(mut self, delay: Duration) -> Self {
        self.retrieve_delay = delay;
        self
    }

    /// Number of connection attempts
    pub(crate) fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    /// Highest number of sessions open at the same time
    pub(crate) fn peak_open(&self) -> usize {
        self.peak_open.load(Ordering::SeqCst)
    }

    /// Number of sessions closed
    pub(crate) fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Remote names passed to retrieve, in call order
    pub(crate) fn retrieved(&self) -> Vec<String> {
        self.retrieved.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn connect(
        &self,
        server: &ServerConfig,
        _timeout: Duration,
    ) -> Result<Box<dyn Session>, TransferError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        if self.fault == Fault::Connect {
            return Err(TransferError::Connect {
                address: server.address(),
                reason: "connection refused".into(),
            });
        }

        let now_open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_open.fetch_max(now_open, Ordering::SeqCst);

        Ok(Box::new(MockSession {
            files: self.files.clone(),
            fault: self.fault,
            retrieve_delay: self.retrieve_delay,
            open: Arc::clone(&self.open),
            closed: Arc::clone(&self.closed),
            retrieved: Arc::clone(&self.retrieved),
            quit: false,
        }))
    }
}

struct MockSession {
    files: HashMap<String, Vec<u8>>,
    fault: Fault,
    retrieve_delay: Duration,
    open: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    retrieved: Arc<Mutex<Vec<String>>>,
    quit: bool,
}

impl Session for MockSession {
    fn login(&mut self, username: &str, _password: &str) -> Result<(), TransferError> {
        if self.fault == Fault::Login {
            return Err(TransferError::Auth {
                username: username.to_string(),
                reason: "530 Login incorrect".into(),
            });
        }
        Ok(())
    }

    fn change_dir(&mut self, path: &str) -> Result<(), TransferError> {
        if self.fault == Fault::ChangeDir {
            return Err(TransferError::NotFound {
                path: path.to_string(),
                reason: "550 No such directory".into(),
            });
        }
        Ok(())
    }

    fn retrieve(&mut self, remote_name: &str, sink: &mut dyn Write) -> Result<u64, TransferError> {
        self.retrieved.lock().unwrap().push(remote_name.to_string());
        if !self.retrieve_delay.is_zero() {
            std::thread::sleep(self.retrieve_delay);
        }

        let body = self
            .files
            .get(remote_name)
            .ok_or_else(|| TransferError::NotFound {
                path: remote_name.to_string(),
                reason: "550 No such file".into(),
            })?;

        // Write in small pieces like a network stream would
        for chunk in body.chunks(1024) {
            sink.write_all(chunk)
                .map_err(|e| TransferError::Connect {
                    address: "mock".into(),
                    reason: e.to_string(),
                })?;
        }
        Ok(body.len() as u64)
    }

    fn quit(&mut self) -> Result<(), TransferError> {
        if !self.quit {
            self.quit = true;
            self.open.fetch_sub(1, Ordering::SeqCst);
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Transfer configuration for `files` with `workers` connections, writing
/// into a `downloads` directory under `temp_dir`.
pub(crate) fn test_config(temp_dir: &TempDir, files: &[&str], workers: usize) -> TransferConfig {
    let mut config = TransferConfig::new(
        "ftp.test.invalid",
        "/pub/data",
        temp_dir.path().join("downloads"),
        files.iter().map(|f| f.to_string()).collect(),
    );
    config.max_connections = workers;
    config
}

/// Helper to create a downloader backed by `transport`.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) fn create_test_downloader(
    transport: Arc<MockTransport>,
    files: &[&str],
    workers: usize,
) -> (FtpDownloader, TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(&temp_dir, files, workers);
    let downloader = FtpDownloader::with_transport(config, transport).unwrap();
    (downloader, temp_dir)
}

/// Deterministic, position-dependent content of `len` bytes
pub(crate) fn sample_bytes(seed: u8, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}
