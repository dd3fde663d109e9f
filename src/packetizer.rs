//! The Async Packetizer (component E): accumulates Idle-mode bytes into a
//! rolling buffer and emits discrete packets on idle-timeout or forced flush.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::time::Instant;

use crate::chunk::ByteChunk;

/// Mutable accumulator for the bytes the Reader sees while Mode=Idle.
pub struct Packetizer {
    buffer: BytesMut,
    last_rx_time: Option<Instant>,
    idle_threshold: Duration,
}

impl Packetizer {
    pub fn new(idle_threshold: Duration) -> Self {
        Self {
            buffer: BytesMut::new(),
            last_rx_time: None,
            idle_threshold,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Appends a chunk read while in Idle mode and refreshes the idle clock.
    pub fn push(&mut self, chunk: &ByteChunk) {
        self.buffer.extend_from_slice(&chunk.bytes);
        self.last_rx_time = Some(chunk.timestamp);
    }

    /// Called every Reader loop iteration while in Idle mode. Emits a packet
    /// once the inter-byte gap has exceeded the idle threshold.
    pub fn maybe_emit(&mut self, now: Instant) -> Option<(Bytes, Instant)> {
        let last = self.last_rx_time?;
        if self.buffer.is_empty() {
            return None;
        }
        if now.saturating_duration_since(last) >= self.idle_threshold {
            Some(self.flush(last))
        } else {
            None
        }
    }

    /// Forces emission regardless of elapsed time, used on an Idle→Sync
    /// transition (I3) and on shutdown.
    pub fn force_flush(&mut self) -> Option<(Bytes, Instant)> {
        let last = self.last_rx_time?;
        if self.buffer.is_empty() {
            return None;
        }
        Some(self.flush(last))
    }

    fn flush(&mut self, timestamp: Instant) -> (Bytes, Instant) {
        let bytes = std::mem::take(&mut self.buffer).freeze();
        self.last_rx_time = None;
        (bytes, timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(bytes: &[u8], ts: Instant) -> ByteChunk {
        ByteChunk {
            bytes: Bytes::copy_from_slice(bytes),
            timestamp: ts,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn emits_after_idle_threshold_elapses() {
        let mut p = Packetizer::new(Duration::from_millis(100));
        let t0 = Instant::now();
        p.push(&chunk(b"hello", t0));
        assert!(p.maybe_emit(t0).is_none());

        tokio::time::advance(Duration::from_millis(150)).await;
        let now = Instant::now();
        let (bytes, ts) = p.maybe_emit(now).expect("should have emitted");
        assert_eq!(&bytes[..], b"hello");
        assert_eq!(ts, t0);
        assert!(p.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn force_flush_emits_regardless_of_elapsed_time() {
        let mut p = Packetizer::new(Duration::from_secs(10));
        let t0 = Instant::now();
        p.push(&chunk(b"urc", t0));
        let (bytes, _) = p.force_flush().expect("non-empty buffer flushes");
        assert_eq!(&bytes[..], b"urc");
        assert!(p.force_flush().is_none());
    }

    #[tokio::test]
    async fn empty_buffer_never_emits() {
        let mut p = Packetizer::new(Duration::from_millis(1));
        assert!(p.maybe_emit(Instant::now()).is_none());
        assert!(p.force_flush().is_none());
    }
}
