//! The Reader (component B): the sole task that pulls bytes off the port
//! and demultiplexes them into the Sync Channel or the Async Packetizer
//! according to the Mode Gate.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::async_store::AsyncStore;
use crate::chunk::{AsyncPacket, ByteChunk};
use crate::mode::{Mode, ModeGate};
use crate::status::ConnectionStatus;
use crate::transport::PortReader;

/// Everything the Reader needs, cloned out of the Engine's shared state.
pub(crate) struct ReaderContext {
    pub mode: Arc<ModeGate>,
    pub sync_tx: mpsc::Sender<ByteChunk>,
    pub store: Arc<AsyncStore>,
    pub status: Arc<ConnectionStatus>,
    pub idle_threshold: Duration,
    pub port_read_timeout: Duration,
}

/// Runs until the connection status is closed (caller-initiated disconnect
/// or a fatal I/O error observed by this very loop), flushing any residual
/// packetizer buffer as a final packet on every exit path.
pub(crate) async fn run<T>(mut reader: PortReader<T>, ctx: ReaderContext)
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let mut packetizer = crate::packetizer::Packetizer::new(ctx.idle_threshold);
    let mut last_mode = Mode::Idle;

    loop {
        if ctx.status.is_closed() {
            break;
        }

        let read_result = reader.read_chunk(ctx.port_read_timeout).await;

        // Snapshot Mode only after the read returns: the read can suspend
        // for up to port_read_timeout, and a pre-read snapshot would route
        // bytes that arrived mid-read by a stale Mode, diverting a
        // command's response into the packetizer (§4.B step order; §5
        // ordering guarantee).
        let mode_now = ctx.mode.load();

        // I3: forced flush on the Idle -> Sync transition, before any bytes
        // read this iteration are routed to the sync path.
        if mode_now == Mode::Sync && last_mode == Mode::Idle {
            if let Some((bytes, ts)) = packetizer.force_flush() {
                tracing::debug!(len = bytes.len(), "mode-switch flush of packetizer buffer");
                ctx.store.push(AsyncPacket::from_bytes(bytes, ts));
            }
        }
        last_mode = mode_now;

        match read_result {
            Ok(bytes) if !bytes.is_empty() => {
                let chunk = ByteChunk {
                    bytes,
                    timestamp: Instant::now(),
                };
                match mode_now {
                    Mode::Sync => {
                        if let Err(mpsc::error::TrySendError::Full(_)) =
                            ctx.sync_tx.try_send(chunk)
                        {
                            tracing::error!(
                                "sync channel overflow: controller is not consuming, closing connection"
                            );
                            ctx.status.close();
                            break;
                        }
                    }
                    Mode::Idle => packetizer.push(&chunk),
                }
            }
            Ok(_) => {
                // Timeout or zero-length read: nothing arrived this
                // iteration, fall through to the idle-timer check below.
            }
            Err(e) => {
                tracing::error!(error = %e, "fatal serial I/O error, closing connection");
                ctx.status.close();
                break;
            }
        }

        if mode_now == Mode::Idle {
            if let Some((bytes, ts)) = packetizer.maybe_emit(Instant::now()) {
                ctx.store.push(AsyncPacket::from_bytes(bytes, ts));
            }
        }
    }

    if let Some((bytes, ts)) = packetizer.force_flush() {
        tracing::debug!(len = bytes.len(), "final flush of packetizer buffer on shutdown");
        ctx.store.push(AsyncPacket::from_bytes(bytes, ts));
    }
}
