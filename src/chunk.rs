//! Shared value types produced by the Reader: raw chunks and the immutable
//! async packets derived from them.

use bytes::Bytes;
use tokio::time::Instant;

use crate::codec::{self, Decoded};

/// An immutable sequence of bytes with a monotonic arrival timestamp.
/// Produced only by the Reader (component B).
#[derive(Debug, Clone)]
pub struct ByteChunk {
    pub bytes: Bytes,
    pub timestamp: Instant,
}

/// A completed, self-contained device-initiated message, delimited by an
/// inter-byte idle interval (or a forced mode-switch flush).
#[derive(Debug, Clone)]
pub struct AsyncPacket {
    pub bytes: Bytes,
    pub decoded: Decoded,
    pub timestamp: Instant,
}

impl AsyncPacket {
    pub fn from_bytes(bytes: Bytes, timestamp: Instant) -> Self {
        let decoded = codec::decode(&bytes);
        Self {
            bytes,
            decoded,
            timestamp,
        }
    }

    pub fn is_hex(&self) -> bool {
        self.decoded.is_hex
    }

    pub fn text(&self) -> &str {
        &self.decoded.text
    }
}
