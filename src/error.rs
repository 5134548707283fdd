//! Error types for ftp-dl
//!
//! Errors are split by scope:
//! - [`Error`] for failures of a whole operation (bad configuration, destination
//!   directory cannot be created, HTTP fetch failed, ...)
//! - [`TransferError`] for a single remote file that could not be downloaded
//! - [`DecompressError`] for a single archive that could not be decompressed
//!
//! Per-item errors never abort a batch; they are collected into a report
//! (see [`crate::types::BatchReport`]).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ftp-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ftp-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_connections")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error from the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTTP request completed with a non-success status
    #[error("HTTP error fetching {url}: status {status}")]
    Http {
        /// The requested URL
        url: String,
        /// The HTTP status code returned by the server
        status: u16,
    },

    /// A required binary is not installed or not on PATH
    #[error(
        "can not locate binary file '{name}' on your system; check if it's installed and is added to your PATH variable"
    )]
    BinaryNotFound {
        /// Name of the binary that was looked up
        name: String,
    },

    /// A worker task panicked or was aborted
    #[error("worker task failed: {0}")]
    TaskFailed(String),
}

/// Failure downloading a single remote file
#[derive(Debug, Error)]
pub enum TransferError {
    /// Could not reach the server within the connect timeout
    #[error("cannot connect to {address}: {reason}")]
    Connect {
        /// The `host:port` that was dialed
        address: String,
        /// The reason the connection failed
        reason: String,
    },

    /// Server rejected the credentials
    #[error("login failed for user '{username}': {reason}")]
    Auth {
        /// The username that was rejected
        username: String,
        /// The reason given by the server
        reason: String,
    },

    /// Remote directory or file does not exist (or is not accessible)
    #[error("remote path '{path}' not found: {reason}")]
    NotFound {
        /// Remote directory or file name
        path: String,
        /// The reason given by the server
        reason: String,
    },

    /// Local file could not be created or written
    #[error("cannot write local file {path}: {source}")]
    LocalIo {
        /// The local path being written
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Blocking transfer task panicked or the worker running it was lost
    #[error("transfer aborted: {reason}")]
    Aborted {
        /// What terminated the transfer
        reason: String,
    },

    /// Transfer was cancelled
    #[error("transfer cancelled")]
    Cancelled,
}

/// Failure decompressing a single archive
#[derive(Debug, Error)]
pub enum DecompressError {
    /// Compressed source could not be opened
    #[error("cannot open {path}: {source}")]
    Open {
        /// The compressed source path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Compressed input is malformed
    #[error("invalid compressed data in {path}: {reason}")]
    Decode {
        /// The compressed source path
        path: PathBuf,
        /// Decoder error message
        reason: String,
    },

    /// Decompressed output could not be created or written
    #[error("cannot write {path}: {source}")]
    Write {
        /// The destination path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Blocking decompression task panicked or the worker running it was lost
    #[error("decompression aborted: {reason}")]
    Aborted {
        /// What terminated the decompression
        reason: String,
    },

    /// Decompression was cancelled
    #[error("decompression cancelled")]
    Cancelled,
}

impl Error {
    /// Machine-readable error code, stable across releases
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Http { .. } => "http_error",
            Error::BinaryNotFound { .. } => "binary_not_found",
            Error::TaskFailed(_) => "task_failed",
        }
    }

    /// Build a configuration error for the given key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

impl TransferError {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            TransferError::Connect { .. } => "connect_failed",
            TransferError::Auth { .. } => "auth_failed",
            TransferError::NotFound { .. } => "not_found",
            TransferError::LocalIo { .. } => "local_io",
            TransferError::Aborted { .. } => "aborted",
            TransferError::Cancelled => "cancelled",
        }
    }
}

impl DecompressError {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            DecompressError::Open { .. } => "open_failed",
            DecompressError::Decode { .. } => "decode_failed",
            DecompressError::Write { .. } => "write_failed",
            DecompressError::Aborted { .. } => "aborted",
            DecompressError::Cancelled => "cancelled",
        }
    }
}
