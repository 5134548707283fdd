//! Common test utilities for ftp-dl integration tests

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use ftp_dl::{ServerConfig, Session, TransferConfig, TransferError, Transport};
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// In-memory FTP server keyed by `directory/name`
///
/// Sessions must log in with the expected credentials and change into an
/// existing directory before they can retrieve anything.
#[derive(Default)]
pub struct MemoryServer {
    files: Mutex<HashMap<String, Vec<u8>>>,
    credentials: Option<(String, String)>,
    sessions: AtomicUsize,
    active: Arc<AtomicUsize>,
    peak_active: Arc<AtomicUsize>,
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require these credentials instead of accepting anyone
    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some((username.to_string(), password.to_string()));
        self
    }

    pub fn put(&self, dir: &str, name: &str, body: impl AsRef<[u8]>) {
        self.files
            .lock()
            .unwrap()
            .insert(format!("{}/{}", dir.trim_end_matches('/'), name), body.as_ref().to_vec());
    }

    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn peak_active(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }
}

/// A transport that dials a shared [`MemoryServer`]
pub struct MemoryTransport(pub Arc<MemoryServer>);

impl Transport for MemoryTransport {
    fn connect(
        &self,
        _server: &ServerConfig,
        _timeout: Duration,
    ) -> Result<Box<dyn Session>, TransferError> {
        let server = Arc::clone(&self.0);
        server.sessions.fetch_add(1, Ordering::SeqCst);
        let now = server.active.fetch_add(1, Ordering::SeqCst) + 1;
        server.peak_active.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            server,
            logged_in: false,
            cwd: None,
            open: true,
        }))
    }
}

struct MemorySession {
    server: Arc<MemoryServer>,
    logged_in: bool,
    cwd: Option<String>,
    open: bool,
}

impl Session for MemorySession {
    fn login(&mut self, username: &str, password: &str) -> Result<(), TransferError> {
        if let Some((user, pass)) = &self.server.credentials
            && (user != username || pass != password)
        {
            return Err(TransferError::Auth {
                username: username.to_string(),
                reason: "530 Login incorrect".into(),
            });
        }
        self.logged_in = true;
        Ok(())
    }

    fn change_dir(&mut self, path: &str) -> Result<(), TransferError> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let exists = self
            .server
            .files
            .lock()
            .unwrap()
            .keys()
            .any(|key| key.starts_with(&prefix));
        if !exists {
            return Err(TransferError::NotFound {
                path: path.to_string(),
                reason: "550 Failed to change directory".into(),
            });
        }
        self.cwd = Some(path.trim_end_matches('/').to_string());
        Ok(())
    }

    fn retrieve(&mut self, remote_name: &str, sink: &mut dyn Write) -> Result<u64, TransferError> {
        let cwd = match (&self.cwd, self.logged_in) {
            (Some(cwd), true) => cwd.clone(),
            _ => {
                return Err(TransferError::NotFound {
                    path: remote_name.to_string(),
                    reason: "530 Please login with USER and PASS".into(),
                });
            }
        };
        let body = self
            .server
            .files
            .lock()
            .unwrap()
            .get(&format!("{cwd}/{remote_name}"))
            .cloned()
            .ok_or_else(|| TransferError::NotFound {
                path: remote_name.to_string(),
                reason: "550 Failed to open file".into(),
            })?;
        sink.write_all(&body).map_err(|e| TransferError::Connect {
            address: "memory".into(),
            reason: e.to_string(),
        })?;
        Ok(body.len() as u64)
    }

    fn quit(&mut self) -> Result<(), TransferError> {
        if self.open {
            self.open = false;
            self.server.active.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Transfer configuration writing into `temp_dir/downloads`
pub fn transfer_config(temp_dir: &TempDir, base_dir: &str, files: &[&str]) -> TransferConfig {
    TransferConfig::new(
        "ftp.memory.invalid",
        base_dir,
        temp_dir.path().join("downloads"),
        files.iter().map(|f| f.to_string()).collect(),
    )
}

pub fn gzip(content: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(content).unwrap();
    encoder.finish().unwrap()
}

/// Check if a live FTP server is configured for the live tests
///
/// - `FTP_TEST_HOST` - server hostname (required)
/// - `FTP_TEST_DIR` - remote directory (required)
/// - `FTP_TEST_FILES` - comma-separated file names (required)
pub fn has_live_server() -> bool {
    ["FTP_TEST_HOST", "FTP_TEST_DIR", "FTP_TEST_FILES"]
        .iter()
        .all(|key| std::env::var(key).is_ok_and(|v| !v.trim().is_empty()))
}

/// Macro to skip test if no live FTP server is configured
#[macro_export]
macro_rules! skip_if_no_live_server {
    () => {
        if !$crate::common::has_live_server() {
            eprintln!("Skipping test: FTP_TEST_HOST, FTP_TEST_DIR or FTP_TEST_FILES not set");
            return;
        }
    };
}
