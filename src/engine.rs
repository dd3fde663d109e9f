//! The Engine: wires the Port Handle, Mode Gate, Sync Channel, Async Store,
//! Reader task, and Sync Controller into the single externally facing
//! `connect` / `send` / `read_async_messages` / `disconnect` surface.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

use crate::async_store::AsyncStore;
use crate::chunk::ByteChunk;
use crate::codec;
use crate::config::{EngineConfig, Encoding, WaitPolicy};
use crate::controller;
use crate::error::{Error, EngineResult};
use crate::mode::ModeGate;
use crate::reader::{self, ReaderContext};
use crate::status::ConnectionStatus;
use crate::transport::{self, PortWriter};

/// Everything the Sync Controller touches while holding the send mutex: the
/// write half of the port and the receiving end of the Sync Channel.
struct SyncHalf<T> {
    writer: PortWriter<T>,
    rx: mpsc::Receiver<ByteChunk>,
}

/// State for one open connection. Recreated fresh by every `connect`;
/// nothing here outlives its matching `disconnect`.
struct PortState<T> {
    port_name: String,
    baud_rate: u32,
    mode: Arc<ModeGate>,
    store: Arc<AsyncStore>,
    status: Arc<ConnectionStatus>,
    sync: AsyncMutex<SyncHalf<T>>,
    reader_handle: StdMutex<Option<JoinHandle<()>>>,
}

/// The outcome of one `send` call: the final decoded response plus the
/// bookkeeping fields the external tool surface reports alongside it.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub raw_bytes: Bytes,
    pub data_text: String,
    pub is_hex: bool,
    pub matched_stop_pattern: Option<bool>,
    pub bytes_received: usize,
    pub truncated: bool,
    pub pending_async_count: usize,
}

/// A drained async message alongside its decode classification.
#[derive(Debug, Clone)]
pub struct AsyncMessage {
    pub text: String,
    pub is_hex: bool,
    pub timestamp_ms_ago: u64,
}

/// One connection's worth of async messages plus the drop count observed
/// since the previous drain.
#[derive(Debug, Clone)]
pub struct AsyncMessages {
    pub messages: Vec<AsyncMessage>,
    pub dropped: u64,
}

/// Arguments accepted by `send`, mirroring the tool surface's `send_data`
/// input shape one-for-one.
#[derive(Debug, Clone, Default)]
pub struct SendArgs {
    pub payload: String,
    pub encoding: Encoding,
    pub wait_policy: WaitPolicy,
    pub stop_pattern: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// Protocol-agnostic serial engine: a singleton connection slot per
/// instance, generic over the transport so tests can drive it with an
/// in-memory duplex pair instead of a real port.
pub struct Engine<T> {
    config: EngineConfig,
    state: StdMutex<Option<Arc<PortState<T>>>>,
}

impl<T> Engine<T>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: StdMutex::new(None),
        }
    }

    pub fn with_env_config() -> Self {
        Self::new(EngineConfig::from_env())
    }

    /// Opens the connection over an already-established transport. Fails if
    /// a connection is already open (no implicit reconnect).
    pub fn connect(&self, port_name: impl Into<String>, transport: T) -> EngineResult<()> {
        let port_name = port_name.into();
        let mut slot = self.state.lock().expect("engine state mutex poisoned");
        if let Some(existing) = slot.as_ref() {
            return Err(Error::AlreadyConnected(existing.port_name.clone()));
        }

        let (port_reader, port_writer) = transport::split(transport, self.config.read_chunk_size);
        let (sync_tx, sync_rx) = mpsc::channel(self.config.sync_channel_cap);

        let mode = Arc::new(ModeGate::new());
        let store = Arc::new(AsyncStore::new(self.config.async_store_cap));
        let status = Arc::new(ConnectionStatus::new());

        let reader_ctx = ReaderContext {
            mode: Arc::clone(&mode),
            sync_tx,
            store: Arc::clone(&store),
            status: Arc::clone(&status),
            idle_threshold: self.config.idle_threshold,
            port_read_timeout: self.config.port_read_timeout,
        };
        let reader_handle = tokio::spawn(reader::run(port_reader, reader_ctx));

        let state = Arc::new(PortState {
            port_name: port_name.clone(),
            baud_rate: self.config.baud_rate,
            mode,
            store,
            status,
            sync: AsyncMutex::new(SyncHalf {
                writer: port_writer,
                rx: sync_rx,
            }),
            reader_handle: StdMutex::new(Some(reader_handle)),
        });

        tracing::info!(port = %port_name, baud = self.config.baud_rate, "connected");
        *slot = Some(state);
        Ok(())
    }

    /// Closes the connection: signals the Reader to stop, waits up to the
    /// configured grace period for it to exit, then drops the port.
    pub async fn disconnect(&self) -> EngineResult<()> {
        let state = {
            let mut slot = self.state.lock().expect("engine state mutex poisoned");
            slot.take().ok_or(Error::NotConnected)?
        };

        state.status.close();
        let handle = state.reader_handle.lock().expect("reader handle mutex poisoned").take();
        if let Some(handle) = handle {
            if tokio::time::timeout(self.config.disconnect_grace, handle)
                .await
                .is_err()
            {
                tracing::warn!(
                    port = %state.port_name,
                    "reader task did not exit within the disconnect grace period"
                );
            }
        }
        tracing::info!(port = %state.port_name, "disconnected");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        match self.state.lock().expect("engine state mutex poisoned").as_ref() {
            Some(state) => !state.status.is_closed(),
            None => false,
        }
    }

    fn active_state(&self) -> EngineResult<Arc<PortState<T>>> {
        let slot = self.state.lock().expect("engine state mutex poisoned");
        match slot.as_ref() {
            Some(state) if !state.status.is_closed() => Ok(Arc::clone(state)),
            _ => Err(Error::NotConnected),
        }
    }

    /// Runs one full synchronous transaction: writes `args.payload`, then
    /// waits for a response according to `args.wait_policy`.
    pub async fn send(&self, args: SendArgs) -> EngineResult<SendOutcome> {
        let state = self.active_state()?;

        if args.wait_policy != WaitPolicy::None && args.payload.is_empty() {
            return Err(Error::EmptyPayload("payload"));
        }
        let payload = codec::encode(&args.payload, args.encoding)?;

        let mut sync = state.sync.lock().await;
        if state.status.is_closed() {
            return Err(Error::NotConnected);
        }

        controller::drain_stale(&mut sync.rx);
        state.mode.enter_sync();
        let write_result = sync.writer.write_all(&payload).await;
        if let Err(e) = write_result {
            state.mode.enter_idle();
            return Err(e);
        }

        let response_cap = self.config.response_buffer_cap;
        let outcome = match args.wait_policy {
            WaitPolicy::None => SendOutcome {
                raw_bytes: Bytes::new(),
                data_text: String::new(),
                is_hex: false,
                matched_stop_pattern: None,
                bytes_received: 0,
                truncated: false,
                pending_async_count: 0,
            },
            WaitPolicy::Timeout => {
                let timeout = controller::require_timeout(
                    args.timeout_ms.map(Duration::from_millis),
                )?;
                let assembled =
                    controller::run_timeout(&mut sync.rx, &state.store, response_cap, timeout)
                        .await?;
                finish_outcome(assembled.bytes, assembled.truncated, assembled.total_received, None)
            }
            WaitPolicy::Keyword => {
                let timeout = controller::require_timeout(
                    args.timeout_ms.map(Duration::from_millis),
                )?;
                let stop_pattern = args.stop_pattern.as_deref().unwrap_or_default();
                let stop_pattern = controller::require_stop_pattern(
                    (!stop_pattern.is_empty()).then_some(stop_pattern.as_bytes()),
                )?;
                let result = controller::run_keyword(
                    &mut sync.rx,
                    &state.store,
                    response_cap,
                    stop_pattern,
                    timeout,
                )
                .await?;
                finish_outcome(
                    result.assembled.bytes,
                    result.assembled.truncated,
                    result.assembled.total_received,
                    Some(result.matched),
                )
            }
            WaitPolicy::AtCommand => {
                let timeout = controller::require_timeout(
                    args.timeout_ms.map(Duration::from_millis),
                )?;
                let result =
                    controller::run_at_command(&mut sync.rx, &state.store, response_cap, timeout)
                        .await?;
                finish_outcome(
                    result.assembled.bytes,
                    result.assembled.truncated,
                    result.assembled.total_received,
                    Some(result.matched),
                )
            }
        };

        state.mode.enter_idle();
        drop(sync);

        let mut outcome = outcome;
        outcome.pending_async_count = state.store.len();
        Ok(outcome)
    }

    /// Atomically drains every async packet accumulated since the previous
    /// call (or since `connect`), alongside the drop count.
    pub fn read_async_messages(&self) -> EngineResult<AsyncMessages> {
        let state = self.active_state()?;
        let drain = state.store.drain_all();
        let now = tokio::time::Instant::now();
        let messages = drain
            .packets
            .into_iter()
            .map(|p| AsyncMessage {
                is_hex: p.is_hex(),
                text: p.text().to_string(),
                timestamp_ms_ago: now.saturating_duration_since(p.timestamp).as_millis() as u64,
            })
            .collect();
        Ok(AsyncMessages {
            messages,
            dropped: drain.dropped,
        })
    }

    pub fn port_name(&self) -> EngineResult<String> {
        Ok(self.active_state()?.port_name.clone())
    }

    pub fn baud_rate(&self) -> EngineResult<u32> {
        Ok(self.active_state()?.baud_rate)
    }
}

fn finish_outcome(
    bytes: Bytes,
    truncated: bool,
    bytes_received: usize,
    matched_stop_pattern: Option<bool>,
) -> SendOutcome {
    let decoded = codec::decode(&bytes);
    SendOutcome {
        is_hex: decoded.is_hex,
        data_text: decoded.text,
        raw_bytes: bytes,
        matched_stop_pattern,
        bytes_received,
        truncated,
        pending_async_count: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::duplex_pair;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    fn test_engine() -> Engine<DuplexStream> {
        let mut cfg = EngineConfig::default();
        cfg.idle_threshold = Duration::from_millis(30);
        cfg.port_read_timeout = Duration::from_millis(5);
        cfg.disconnect_grace = Duration::from_millis(200);
        Engine::new(cfg)
    }

    #[tokio::test]
    async fn connect_twice_without_disconnect_fails() {
        let engine = test_engine();
        let (engine_side, _device_side) = duplex_pair(256);
        engine.connect("mock0", engine_side).unwrap();

        let (other_side, _other_device) = duplex_pair(256);
        let err = engine.connect("mock1", other_side).unwrap_err();
        assert!(matches!(err, Error::AlreadyConnected(_)));
        engine.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn send_with_keyword_policy_matches_stop_pattern() {
        let engine = test_engine();
        let (engine_side, mut device_side) = duplex_pair(256);
        engine.connect("mock0", engine_side).unwrap();

        let echo_task = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let n = device_side.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"AT+CSQ\r\n");
            device_side.write_all(b"+CSQ: 22,99\r\nOK\r\n").await.unwrap();
        });

        let outcome = engine
            .send(SendArgs {
                payload: "AT+CSQ\r\n".to_string(),
                encoding: Encoding::Utf8,
                wait_policy: WaitPolicy::Keyword,
                stop_pattern: Some("OK\r\n".to_string()),
                timeout_ms: Some(500),
            })
            .await
            .unwrap();

        echo_task.await.unwrap();
        assert_eq!(outcome.matched_stop_pattern, Some(true));
        assert_eq!(outcome.data_text, "+CSQ: 22,99\r\nOK\r\n");
        assert!(!outcome.truncated);
        engine.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn send_without_connection_is_not_connected_error() {
        let engine = test_engine();
        let err = engine
            .send(SendArgs {
                payload: "x".to_string(),
                wait_policy: WaitPolicy::None,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn async_bytes_surface_through_read_async_messages() {
        let engine = test_engine();
        let (engine_side, mut device_side) = duplex_pair(256);
        engine.connect("mock0", engine_side).unwrap();

        device_side.write_all(b"+URC: READY\r\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        let drained = engine.read_async_messages().unwrap();
        assert_eq!(drained.messages.len(), 1);
        assert_eq!(drained.messages[0].text, "+URC: READY\r\n");
        assert_eq!(drained.dropped, 0);
        engine.disconnect().await.unwrap();
    }
}
