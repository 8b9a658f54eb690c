//! Streaming SHA-256 digests for backup artifacts

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read buffer used while hashing. Memory use stays at this size no matter
/// how large the artifact is.
pub const DIGEST_CHUNK_SIZE: usize = 64 * 1024;

/// Hex-encoded SHA-256 content digest (64 lowercase characters)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Wrap an already hex-encoded digest as read back from a ledger store
    pub fn from_hex<S: Into<String>>(hex: S) -> Self {
        Self(hex.into().to_ascii_lowercase())
    }

    /// Hex representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Incremental hasher for callers that already hold the bytes in pieces
pub struct StreamingHasher {
    hasher: Sha256,
    bytes: u64,
}

impl StreamingHasher {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
            bytes: 0,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.bytes += data.len() as u64;
    }

    /// Number of bytes hashed so far
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes
    }

    pub fn finalize(self) -> Digest {
        Digest(format!("{:x}", self.hasher.finalize()))
    }
}

impl Default for StreamingHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash a byte stream in fixed-size chunks.
pub async fn compute_digest<R>(reader: &mut R) -> std::io::Result<Digest>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut hasher = StreamingHasher::new();
    let mut buffer = vec![0u8; DIGEST_CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA256 of "hello world"
    const HELLO_WORLD: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_streaming_hasher() {
        let mut hasher = StreamingHasher::new();
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(hasher.bytes_hashed(), 11);
        assert_eq!(hasher.finalize().as_str(), HELLO_WORLD);
    }

    #[tokio::test]
    async fn test_compute_digest_from_reader() {
        let mut reader: &[u8] = b"hello world";
        let digest = compute_digest(&mut reader).await.unwrap();
        assert_eq!(digest.as_str(), HELLO_WORLD);
    }

    #[tokio::test]
    async fn test_compute_digest_spans_multiple_chunks() {
        let data = vec![0xABu8; DIGEST_CHUNK_SIZE * 3 + 17];

        let mut single = StreamingHasher::new();
        single.update(&data);
        let expected = single.finalize();

        let mut reader: &[u8] = &data;
        let digest = compute_digest(&mut reader).await.unwrap();
        assert_eq!(digest, expected);
        assert_eq!(digest.as_str().len(), 64);
    }

    #[tokio::test]
    async fn test_compute_digest_short_reads() {
        let mut reader = tokio_test::io::Builder::new()
            .read(b"hel")
            .read(b"lo ")
            .read(b"world")
            .build();
        let digest = compute_digest(&mut reader).await.unwrap();
        assert_eq!(digest.as_str(), HELLO_WORLD);
    }

    #[tokio::test]
    async fn test_compute_digest_propagates_read_error() {
        let mut reader = tokio_test::io::Builder::new()
            .read(b"partial")
            .read_error(std::io::Error::other("device went away"))
            .build();
        let err = compute_digest(&mut reader).await.unwrap_err();
        assert_eq!(err.to_string(), "device went away");
    }

    #[test]
    fn test_digest_from_hex_normalizes_case() {
        let digest = Digest::from_hex(HELLO_WORLD.to_uppercase());
        assert_eq!(digest.as_str(), HELLO_WORLD);
        assert_eq!(digest.short(), "b94d27b9934d");
    }
}
