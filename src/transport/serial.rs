//! Production Port Handle backend: a real OS serial descriptor via
//! `serial2-tokio`, configured 8/N/1 at the caller-supplied baud rate.

use serial2_tokio::SerialPort;

use crate::error::Error;

/// Opens `path` at `baud_rate`, 8/N/1.
///
/// Errors from the OS (device disappeared, permission denied, already
/// busy) all surface as a single connectivity fault (`Error::Io`).
pub fn open(path: &str, baud_rate: u32) -> Result<SerialPort, Error> {
    SerialPort::open(path, baud_rate).map_err(Error::Io)
}
