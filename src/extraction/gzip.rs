use crate::error::DecompressError;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Copy buffer size for streaming decompression
const CHUNK_SIZE: usize = 64 * 1024;

/// Decompress a gzip file into `destination`
///
/// Streams the decompressed bytes straight to disk; the destination is
/// created if absent and truncated otherwise. Concatenated gzip members are
/// decompressed one after another. Returns the number of bytes written.
///
/// # Example
///
/// ```no_run
/// use ftp_dl::extraction::gzip_decompress;
/// use std::path::Path;
///
/// let bytes = gzip_decompress(Path::new("data.txt.gz"), Path::new("data.txt"))?;
/// println!("wrote {bytes} bytes");
/// # Ok::<(), ftp_dl::DecompressError>(())
/// ```
pub fn gzip_decompress(source: &Path, destination: &Path) -> Result<u64, DecompressError> {
    decompress_gzip_file(source, destination, &CancellationToken::new())
}

/// [`gzip_decompress`] that stops between chunks once `cancel` fires
pub(crate) fn decompress_gzip_file(
    source: &Path,
    destination: &Path,
    cancel: &CancellationToken,
) -> Result<u64, DecompressError> {
    debug!(?source, ?destination, "decompressing gzip file");

    let input = File::open(source).map_err(|e| DecompressError::Open {
        path: source.to_path_buf(),
        source: e,
    })?;
    let mut decoder = MultiGzDecoder::new(BufReader::new(input));
    let mut buf = vec![0u8; CHUNK_SIZE];

    // Read before creating the destination so a malformed header leaves no output
    let first = read_chunk(&mut decoder, &mut buf, source)?;

    let output = File::create(destination).map_err(|e| DecompressError::Write {
        path: destination.to_path_buf(),
        source: e,
    })?;
    let mut writer = BufWriter::new(output);

    let result = copy_chunks(&mut decoder, &mut writer, &mut buf, first, source, destination, cancel);
    if result.is_err() {
        drop(writer);
        if let Err(e) = std::fs::remove_file(destination) {
            warn!(?destination, error = %e, "failed to remove partial output");
        }
    }
    result
}

fn copy_chunks(
    decoder: &mut impl Read,
    writer: &mut BufWriter<File>,
    buf: &mut [u8],
    first: usize,
    source: &Path,
    destination: &Path,
    cancel: &CancellationToken,
) -> Result<u64, DecompressError> {
    let write_error = |e| DecompressError::Write {
        path: destination.to_path_buf(),
        source: e,
    };

    let mut total = 0u64;
    let mut n = first;
    while n > 0 {
        if cancel.is_cancelled() {
            return Err(DecompressError::Cancelled);
        }
        writer.write_all(&buf[..n]).map_err(write_error)?;
        total += n as u64;
        n = read_chunk(decoder, buf, source)?;
    }
    writer.flush().map_err(write_error)?;
    Ok(total)
}

fn read_chunk(decoder: &mut impl Read, buf: &mut [u8], source: &Path) -> Result<usize, DecompressError> {
    loop {
        match decoder.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(DecompressError::Decode {
                    path: source.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }
    }
}
