//! The Port Handle (component A): owns the OS serial descriptor and
//! exposes a split read/write half so the Reader task and the Sync
//! Controller's writer can operate concurrently without a lock around the
//! descriptor itself (I1 — the Reader remains the sole reader).

mod serial;

#[cfg(test)]
pub mod mock;

pub use serial::open as open_serial;

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::error::Error;

/// Read half of an open port. Exclusively owned by the Reader task.
pub struct PortReader<T> {
    inner: ReadHalf<T>,
    chunk_size: usize,
}

/// Write half of an open port. Used only under the Sync Controller's send
/// mutex, so at most one writer is ever active.
pub struct PortWriter<T> {
    inner: WriteHalf<T>,
}

/// Splits a full-duplex transport into independent read/write halves.
pub fn split<T>(transport: T, chunk_size: usize) -> (PortReader<T>, PortWriter<T>)
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (read_half, write_half) = tokio::io::split(transport);
    (
        PortReader {
            inner: read_half,
            chunk_size,
        },
        PortWriter { inner: write_half },
    )
}

impl<T> PortReader<T>
where
    T: AsyncRead + Unpin,
{
    /// Reads up to `chunk_size` bytes with a short timeout so the Reader
    /// loop can poll the Mode and shutdown signals responsively.
    ///
    /// Returns an empty `Bytes` on timeout (not an error) and bubbles up a
    /// connectivity fault for any other I/O error, matching "Errors from
    /// the OS ... propagate as a single connectivity fault".
    pub async fn read_chunk(&mut self, timeout: Duration) -> Result<Bytes, Error> {
        let mut buf = BytesMut::zeroed(self.chunk_size);
        match tokio::time::timeout(timeout, self.inner.read(&mut buf)).await {
            Ok(Ok(0)) => Ok(Bytes::new()),
            Ok(Ok(n)) => {
                buf.truncate(n);
                Ok(buf.freeze())
            }
            Ok(Err(e)) => Err(Error::Io(e)),
            Err(_elapsed) => Ok(Bytes::new()),
        }
    }
}

impl<T> PortWriter<T>
where
    T: AsyncWrite + Unpin,
{
    /// Writes the full buffer, retrying any partial write until it is
    /// exhausted or a fatal I/O error occurs.
    pub async fn write_all(&mut self, payload: &[u8]) -> Result<(), Error> {
        self.inner.write_all(payload).await.map_err(Error::Io)?;
        self.inner.flush().await.map_err(Error::Io)?;
        Ok(())
    }
}
