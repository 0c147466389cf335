//! Incremental size + SHA-256 accounting for streamed artifacts.

use sha2::{Digest, Sha256};

/// Lowercase hex encoding of a byte slice.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(char::from(HEX[(b >> 4) as usize]));
        out.push(char::from(HEX[(b & 0xf) as usize]));
    }
    out
}

/// Counts bytes and hashes them as they stream past.
#[derive(Debug, Default, Clone)]
pub struct DigestCounter {
    hasher: Sha256,
    size: u64,
}

impl DigestCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.size += chunk.len() as u64;
    }

    /// Byte count and hex digest of everything seen.
    #[must_use]
    pub fn finish(self) -> (u64, String) {
        (self.size, hex_encode(&self.hasher.finalize()))
    }
}
