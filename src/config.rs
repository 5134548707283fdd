//! Configuration types for ftp-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Hard ceiling on concurrently running decompression workers
pub const MAX_DECOMPRESS_WORKERS: usize = 5;

/// FTP server configuration
///
/// Shared read-only by every download worker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server hostname
    pub host: String,

    /// Server port (default: 21)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Username for authentication (default: "anonymous")
    #[serde(default = "default_credential")]
    pub username: String,

    /// Password for authentication (default: "anonymous")
    #[serde(default = "default_credential")]
    pub password: String,
}

impl ServerConfig {
    /// Anonymous-login configuration for a public server on the default port
    pub fn anonymous(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            username: default_credential(),
            password: default_credential(),
        }
    }

    /// The `host:port` address dialed by each session
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Bulk transfer configuration
///
/// Built once per invocation and never mutated after the workers start.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Server to download from
    pub server: ServerConfig,

    /// Number of download workers, i.e. maximum simultaneous connections (default: 3)
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Remote directory every session changes into before retrieving
    pub base_dir: String,

    /// Local directory the files are written to (created if absent)
    pub dest_dir: PathBuf,

    /// Remote file names, relative to `base_dir`
    #[serde(default)]
    pub files: Vec<String>,

    /// Timeout for establishing each connection (default: 5 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,
}

impl TransferConfig {
    /// Configuration for a public server with anonymous login, port 21 and
    /// three connections.
    ///
    /// # Example
    ///
    /// ```
    /// use ftp_dl::config::TransferConfig;
    ///
    /// let config = TransferConfig::new(
    ///     "ftp.example.org",
    ///     "/pub/data",
    ///     "downloads",
    ///     vec!["a.txt.gz".to_string(), "b.txt.gz".to_string()],
    /// );
    /// assert_eq!(config.server.port, 21);
    /// assert_eq!(config.max_connections, 3);
    /// ```
    pub fn new(
        host: impl Into<String>,
        base_dir: impl Into<String>,
        dest_dir: impl Into<PathBuf>,
        files: Vec<String>,
    ) -> Self {
        Self {
            server: ServerConfig::anonymous(host),
            max_connections: default_max_connections(),
            base_dir: base_dir.into(),
            dest_dir: dest_dir.into(),
            files,
            connect_timeout: default_connect_timeout(),
        }
    }

    /// Check the invariants the worker pool relies on
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(Error::config(
                "max_connections",
                "max_connections must be at least 1",
            ));
        }
        if self.server.host.trim().is_empty() {
            return Err(Error::config("server.host", "server host must not be empty"));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::config(
                "connect_timeout",
                "connect_timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Parallel decompression configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Requested number of decompression workers (default: 5, capped at
    /// [`MAX_DECOMPRESS_WORKERS`])
    #[serde(default = "default_decompress_workers")]
    pub max_workers: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_workers: default_decompress_workers(),
        }
    }
}

impl ExtractionConfig {
    /// Number of workers actually started for `job_count` jobs
    ///
    /// Clamped to `1..=MAX_DECOMPRESS_WORKERS` and never more than the number of jobs.
    pub fn effective_workers(&self, job_count: usize) -> usize {
        self.max_workers
            .clamp(1, MAX_DECOMPRESS_WORKERS)
            .min(job_count)
    }
}

// Default value functions
fn default_port() -> u16 {
    21
}

fn default_credential() -> String {
    "anonymous".to_string()
}

fn default_max_connections() -> usize {
    3
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_decompress_workers() -> usize {
    MAX_DECOMPRESS_WORKERS
}

/// Serialize durations as whole seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
