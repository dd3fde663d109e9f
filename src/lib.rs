//! Protocol-agnostic serial-port I/O engine.
//!
//! Demultiplexes bytes from a single serial connection into two
//! independent consumption paths: synchronous request/response
//! transactions (`send`) and an asynchronous stream of device-initiated
//! notifications (`read_async_messages`). The engine makes no assumptions
//! about the command protocol spoken over the wire — AT commands, Modbus
//! RTU, or an arbitrary line protocol are all just bytes to it.
//!
//! # Example
//! This example opens a connection over a real serial port and runs one
//! AT-style query, waiting for the device's terminal line.
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use serial_mux::{EngineBuilder, SendArgs};
//! use serial_mux::config::{Encoding, WaitPolicy};
//!
//! let engine = EngineBuilder::new().with_serial("/dev/ttyUSB0").build()?;
//! let outcome = engine
//!     .send(SendArgs {
//!         payload: "AT+CSQ\r\n".to_string(),
//!         encoding: Encoding::Utf8,
//!         wait_policy: WaitPolicy::AtCommand,
//!         stop_pattern: None,
//!         timeout_ms: Some(2000),
//!     })
//!     .await?;
//! println!("{}", outcome.data_text);
//! # Ok(())
//! # }
//! ```
//!
//! # Example
//! Draining the asynchronous notification stream (e.g. unsolicited `+URC`
//! lines) independently of any in-flight command.
//!
//! ```no_run
//! # fn example(engine: &serial_mux::Engine<serial2_tokio::SerialPort>) -> Result<(), Box<dyn std::error::Error>> {
//! let drained = engine.read_async_messages()?;
//! for message in drained.messages {
//!     println!("urc: {}", message.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod async_store;
pub mod builder;
pub mod chunk;
pub mod codec;
pub mod config;
pub(crate) mod controller;
pub mod engine;
pub mod error;
pub(crate) mod mode;
pub(crate) mod packetizer;
pub(crate) mod reader;
pub(crate) mod status;
pub mod tool;
pub mod transport;

pub use builder::EngineBuilder;
pub use config::EngineConfig;
pub use engine::{AsyncMessage, AsyncMessages, Engine, SendArgs, SendOutcome};
pub use error::{Error, ErrorCode, EngineResult};
