//! In-memory duplex transport used by the engine's own tests to drive the
//! Reader/Controller/Packetizer pipeline without real hardware.

use tokio::io::DuplexStream;

/// Creates a connected pair: `(engine_side, device_side)`. `engine_side` is
/// handed to [`crate::transport::split`] exactly like a real serial port;
/// `device_side` is held by the test to script what the simulated device
/// writes and to observe what the engine wrote to it.
pub fn duplex_pair(buffer_size: usize) -> (DuplexStream, DuplexStream) {
    tokio::io::duplex(buffer_size)
}
