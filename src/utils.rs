//! Utility functions for path handling and the local environment

use crate::error::{Error, Result, TransferError};
use std::path::{Path, PathBuf};

/// Base name of a remote file, used as the local file name
///
/// Both `/` and `\` are treated as separators, so `pub/data/a.txt.gz`
/// becomes `a.txt.gz`. Names that would resolve outside the destination
/// directory (empty, `.` or `..`) are rejected.
///
/// # Examples
///
/// ```
/// use ftp_dl::utils::local_file_name;
///
/// assert_eq!(local_file_name("pub/data/a.txt.gz").unwrap(), "a.txt.gz");
/// assert_eq!(local_file_name("b.txt").unwrap(), "b.txt");
/// assert!(local_file_name("pub/data/").is_err());
/// ```
pub fn local_file_name(remote_name: &str) -> std::result::Result<&str, TransferError> {
    let base = remote_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(remote_name);

    if base.is_empty() || base == "." || base == ".." {
        return Err(TransferError::LocalIo {
            path: PathBuf::from(remote_name),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "remote name has no usable file name component",
            ),
        });
    }
    Ok(base)
}

/// Create a directory and its parents, succeeding if it already exists
pub async fn ensure_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path).await.map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("failed to create directory '{}': {}", path.display(), e),
        ))
    })
}

/// Check that a binary is installed and reachable through PATH
///
/// Returns the resolved path of the binary.
pub fn check_binary_exists(binary_name: &str) -> Result<PathBuf> {
    which::which(binary_name).map_err(|_| Error::BinaryNotFound {
        name: binary_name.to_string(),
    })
}
