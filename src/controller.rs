//! The Sync Controller (component G): implements the four wait policies,
//! assembles the ResponseBuffer, and decides termination.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::async_store::AsyncStore;
use crate::chunk::{AsyncPacket, ByteChunk};
use crate::error::{Error, EngineResult};

/// AT_COMMAND's compound stop condition: the first occurrence of any of
/// these terminators, echo included and not stripped.
pub const AT_COMMAND_TERMINATORS: [&[u8]; 3] = [b"OK\r\n", b"ERROR\r\n", b"> "];

/// Mutable byte accumulator local to a single in-flight `send`.
///
/// Bounded by `cap` (default 4096). Once the cap is reached, further bytes
/// for this call are diverted directly into the Async Store (bypassing the
/// packetizer's idle timer, since they arrived mid-transaction) instead of
/// being silently dropped, and `truncated` is set. `total_received` counts
/// every byte pulled off the Sync Channel for this call, retained or not.
pub(crate) struct ResponseBuffer<'a> {
    buf: BytesMut,
    cap: usize,
    truncated: bool,
    total_received: usize,
    overflow_store: &'a AsyncStore,
}

pub(crate) struct Assembled {
    pub bytes: Bytes,
    pub truncated: bool,
    pub total_received: usize,
}

impl<'a> ResponseBuffer<'a> {
    fn new(cap: usize, overflow_store: &'a AsyncStore) -> Self {
        Self {
            buf: BytesMut::new(),
            cap,
            truncated: false,
            total_received: 0,
            overflow_store,
        }
    }

    fn push(&mut self, chunk: ByteChunk) {
        self.total_received += chunk.bytes.len();

        if self.buf.len() >= self.cap {
            self.truncated = true;
            tracing::warn!(
                cap = self.cap,
                "response buffer cap reached, diverting bytes to async store"
            );
            self.overflow_store
                .push(AsyncPacket::from_bytes(chunk.bytes, chunk.timestamp));
            return;
        }
        let room = self.cap - self.buf.len();
        if chunk.bytes.len() > room {
            self.truncated = true;
            self.buf.extend_from_slice(&chunk.bytes[..room]);
            let overflow = chunk.bytes.slice(room..);
            self.overflow_store
                .push(AsyncPacket::from_bytes(overflow, chunk.timestamp));
        } else {
            self.buf.extend_from_slice(&chunk.bytes);
        }
    }

    fn contains(&self, pattern: &[u8]) -> bool {
        !pattern.is_empty() && windows_contain(&self.buf, pattern)
    }

    fn contains_any(&self, patterns: &[&[u8]]) -> bool {
        patterns.iter().any(|p| self.contains(p))
    }

    fn into_parts(self) -> Assembled {
        Assembled {
            bytes: self.buf.freeze(),
            truncated: self.truncated,
            total_received: self.total_received,
        }
    }
}

fn windows_contain(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Pops the next chunk from the Sync Channel, bounded by the time
/// remaining until `deadline`. Returns `None` on timeout.
async fn pop_until(rx: &mut mpsc::Receiver<ByteChunk>, deadline: Instant) -> Option<ByteChunk> {
    let now = Instant::now();
    if now >= deadline {
        return None;
    }
    tokio::time::timeout(deadline - now, rx.recv())
        .await
        .ok()
        .flatten()
}

/// Drains any stale chunks left in the channel (should normally be empty —
/// I4 discards on Sync->Idle exit) without blocking.
pub(crate) fn drain_stale(rx: &mut mpsc::Receiver<ByteChunk>) {
    while rx.try_recv().is_ok() {}
}

pub(crate) struct KeywordResult {
    pub assembled: Assembled,
    pub matched: bool,
}

/// KEYWORD policy: search for `stop_pattern` after every chunk append;
/// first match wins. Timeout without a match is success, not an error.
pub(crate) async fn run_keyword(
    rx: &mut mpsc::Receiver<ByteChunk>,
    overflow_store: &AsyncStore,
    response_cap: usize,
    stop_pattern: &[u8],
    timeout: Duration,
) -> EngineResult<KeywordResult> {
    let deadline = Instant::now() + timeout;
    let mut response = ResponseBuffer::new(response_cap, overflow_store);

    loop {
        let Some(chunk) = pop_until(rx, deadline).await else {
            return Ok(KeywordResult {
                assembled: response.into_parts(),
                matched: false,
            });
        };
        response.push(chunk);
        if response.contains(stop_pattern) {
            return Ok(KeywordResult {
                assembled: response.into_parts(),
                matched: true,
            });
        }
    }
}

/// TIMEOUT policy: accumulate every chunk until `timeout` elapses. Always
/// succeeds, even with zero bytes received.
pub(crate) async fn run_timeout(
    rx: &mut mpsc::Receiver<ByteChunk>,
    overflow_store: &AsyncStore,
    response_cap: usize,
    timeout: Duration,
) -> EngineResult<Assembled> {
    let deadline = Instant::now() + timeout;
    let mut response = ResponseBuffer::new(response_cap, overflow_store);

    while let Some(chunk) = pop_until(rx, deadline).await {
        response.push(chunk);
    }
    Ok(response.into_parts())
}

/// AT_COMMAND policy: KEYWORD with the compound `"OK\r\n"` / `"ERROR\r\n"` /
/// `"> "` stop condition. Echo, if present, is never stripped.
pub(crate) async fn run_at_command(
    rx: &mut mpsc::Receiver<ByteChunk>,
    overflow_store: &AsyncStore,
    response_cap: usize,
    timeout: Duration,
) -> EngineResult<KeywordResult> {
    let deadline = Instant::now() + timeout;
    let mut response = ResponseBuffer::new(response_cap, overflow_store);

    loop {
        let Some(chunk) = pop_until(rx, deadline).await else {
            return Ok(KeywordResult {
                assembled: response.into_parts(),
                matched: false,
            });
        };
        response.push(chunk);
        if response.contains_any(&AT_COMMAND_TERMINATORS) {
            return Ok(KeywordResult {
                assembled: response.into_parts(),
                matched: true,
            });
        }
    }
}

/// Validates the inputs a policy requires before the preamble writes
/// anything to the wire.
pub(crate) fn require_stop_pattern(pattern: Option<&[u8]>) -> EngineResult<&[u8]> {
    match pattern {
        Some(p) if !p.is_empty() => Ok(p),
        Some(_) => Err(Error::EmptyPayload("stop_pattern")),
        None => Err(Error::MissingArgument("stop_pattern")),
    }
}

pub(crate) fn require_timeout(timeout: Option<Duration>) -> EngineResult<Duration> {
    timeout.ok_or(Error::MissingArgument("timeout_ms"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_buffer_finds_pattern_straddling_two_pushes() {
        let store = AsyncStore::new(10);
        let mut rb = ResponseBuffer::new(4096, &store);
        rb.push(ByteChunk {
            bytes: Bytes::from_static(b"12O"),
            timestamp: Instant::now(),
        });
        assert!(!rb.contains(b"OK"));
        rb.push(ByteChunk {
            bytes: Bytes::from_static(b"K34"),
            timestamp: Instant::now(),
        });
        assert!(rb.contains(b"OK"));
    }

    #[test]
    fn response_buffer_truncates_and_diverts_overflow() {
        let store = AsyncStore::new(10);
        let mut rb = ResponseBuffer::new(4, &store);
        rb.push(ByteChunk {
            bytes: Bytes::from_static(b"abcdef"),
            timestamp: Instant::now(),
        });
        let assembled = rb.into_parts();
        assert_eq!(&assembled.bytes[..], b"abcd");
        assert!(assembled.truncated);
        assert_eq!(assembled.total_received, 6);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn keyword_returns_unmatched_on_timeout_not_as_error() {
        let (_tx, mut rx) = mpsc::channel(8);
        let store = AsyncStore::new(10);
        let result = run_keyword(&mut rx, &store, 4096, b"OK", Duration::from_millis(20))
            .await
            .unwrap();
        assert!(!result.matched);
        assert!(result.assembled.bytes.is_empty());
    }
}
