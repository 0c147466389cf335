//! Helpers for moving whole documents through [`ByteStream`] ports.

use futures_util::{StreamExt, stream};

use crate::application::ports::ByteStream;
use crate::domain::ToolsError;

/// Wrap an in-memory document as a single-chunk stream.
#[must_use]
pub fn from_bytes(data: Vec<u8>) -> ByteStream {
    Box::pin(stream::once(async move { Ok(data) }))
}

/// Drain a stream into memory. Only used for small catalog documents.
///
/// # Errors
///
/// Returns a transient I/O error naming `what` if the stream fails.
pub async fn read_all(mut body: ByteStream, what: &str) -> Result<Vec<u8>, ToolsError> {
    let mut out = Vec::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| ToolsError::io(format!("reading {what}"), e))?;
        out.extend_from_slice(&chunk);
    }
    Ok(out)
}
