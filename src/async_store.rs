//! The Async Store (component F): a bounded FIFO of completed async
//! packets, drained atomically by `read_async_messages`.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::chunk::AsyncPacket;

struct Inner {
    packets: VecDeque<AsyncPacket>,
    cap: usize,
    dropped: u64,
}

/// Drop-oldest bounded queue. Enqueue never blocks the Reader; on overflow
/// the oldest packet is discarded and the drop counter is incremented, to
/// be reported on the next drain.
pub struct AsyncStore {
    inner: Mutex<Inner>,
}

/// A drained snapshot: all packets published before the drain, plus the
/// number silently dropped for overflow since the previous drain.
pub struct Drain {
    pub packets: Vec<AsyncPacket>,
    pub dropped: u64,
}

impl AsyncStore {
    pub fn new(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                packets: VecDeque::with_capacity(cap.min(4096)),
                cap,
                dropped: 0,
            }),
        }
    }

    /// Publishes a packet, dropping the oldest one if the store is full.
    pub fn push(&self, packet: AsyncPacket) {
        let mut inner = self.inner.lock().expect("async store mutex poisoned");
        if inner.packets.len() >= inner.cap {
            inner.packets.pop_front();
            inner.dropped += 1;
            tracing::warn!(cap = inner.cap, "async store full, dropping oldest packet");
        }
        inner.packets.push_back(packet);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("async store mutex poisoned").packets.len()
    }

    /// Atomically empties the store and returns everything it held.
    pub fn drain_all(&self) -> Drain {
        let mut inner = self.inner.lock().expect("async store mutex poisoned");
        let packets = inner.packets.drain(..).collect();
        let dropped = std::mem::take(&mut inner.dropped);
        Drain { packets, dropped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::time::Instant;

    fn packet(text: &[u8]) -> AsyncPacket {
        AsyncPacket::from_bytes(Bytes::copy_from_slice(text), Instant::now())
    }

    #[test]
    fn drains_in_fifo_order() {
        let store = AsyncStore::new(10);
        store.push(packet(b"first"));
        store.push(packet(b"second"));
        let drain = store.drain_all();
        assert_eq!(drain.packets.len(), 2);
        assert_eq!(drain.packets[0].text(), "first");
        assert_eq!(drain.packets[1].text(), "second");
        assert_eq!(drain.dropped, 0);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn overflow_drops_oldest_and_counts() {
        let store = AsyncStore::new(2);
        store.push(packet(b"a"));
        store.push(packet(b"b"));
        store.push(packet(b"c"));
        let drain = store.drain_all();
        assert_eq!(drain.packets.len(), 2);
        assert_eq!(drain.packets[0].text(), "b");
        assert_eq!(drain.packets[1].text(), "c");
        assert_eq!(drain.dropped, 1);
    }

    #[test]
    fn drain_during_publish_window_is_deferred() {
        let store = AsyncStore::new(10);
        store.push(packet(b"before"));
        let first = store.drain_all();
        assert_eq!(first.packets.len(), 1);
        store.push(packet(b"after"));
        let second = store.drain_all();
        assert_eq!(second.packets.len(), 1);
        assert_eq!(second.packets[0].text(), "after");
    }
}
