//! Filesystem infrastructure — chunked file streams.

use std::path::Path;

use futures_util::stream;
use tokio::io::AsyncReadExt;

use crate::application::ports::ByteStream;

/// Read size for streamed files.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Open `path` as a stream of [`CHUNK_SIZE`] chunks.
///
/// # Errors
///
/// Returns the error from opening the file.
pub async fn file_stream(path: &Path) -> std::io::Result<ByteStream> {
    let file = tokio::fs::File::open(path).await?;
    Ok(Box::pin(stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some((buf, file)))
    })))
}
