//! Single-file HTTP download

use crate::error::{Error, Result};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Timeout for a whole HTTP fetch in seconds
const HTTP_FETCH_TIMEOUT_SECS: u64 = 300;

/// Download `url` to `output_path`, streaming the body to disk.
///
/// The output file is created (or truncated) only after a success status is
/// received. Returns the number of bytes written.
pub async fn fetch_to_file(url: &str, output_path: &Path) -> Result<u64> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_FETCH_TIMEOUT_SECS))
        .build()?;

    debug!(url, "fetching file over HTTP");
    let mut response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Http {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let mut file = tokio::fs::File::create(output_path).await.map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("failed to create '{}': {}", output_path.display(), e),
        ))
    })?;

    let mut bytes = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        bytes += chunk.len() as u64;
    }
    file.flush().await?;

    info!(url, path = %output_path.display(), bytes, "fetched file over HTTP");
    Ok(bytes)
}
