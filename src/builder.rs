//! Type-state builder for [`Engine`], mirroring the connect-mode builder
//! pattern of the controller crate this engine is descended from — reduced
//! to a single state since serial is now the only supported transport.

use std::marker::PhantomData;

use serial2_tokio::SerialPort;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::EngineResult;

pub struct Init;
pub struct Serial;

/// Type-state builder for an [`Engine<SerialPort>`].
pub struct EngineBuilder<S> {
    com_port: Option<String>,
    config: EngineConfig,
    _marker: PhantomData<S>,
}

impl Default for EngineBuilder<Init> {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder<Init> {
    pub fn new() -> Self {
        Self {
            com_port: None,
            config: EngineConfig::from_env(),
            _marker: PhantomData,
        }
    }

    /// Continues toward building an engine bound to a real serial port.
    pub fn with_serial(self, com_port: &str) -> EngineBuilder<Serial> {
        EngineBuilder {
            com_port: Some(com_port.to_string()),
            config: self.config,
            _marker: PhantomData,
        }
    }
}

impl EngineBuilder<Serial> {
    pub fn baud(mut self, baud_rate: u32) -> Self {
        self.config.baud_rate = baud_rate;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Opens the serial port and returns a connected [`Engine`].
    pub fn build(self) -> EngineResult<Engine<SerialPort>> {
        let com_port = self
            .com_port
            .as_ref()
            .expect("COM port required to reach the serial build method");

        let transport = crate::transport::open_serial(com_port, self.config.baud_rate)?;
        let engine = Engine::new(self.config);
        engine.connect(com_port.clone(), transport)?;
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_carries_baud_override_into_config() {
        let builder = EngineBuilder::new().with_serial("/dev/ttyUSB0").baud(9600);
        assert_eq!(builder.config.baud_rate, 9600);
        assert_eq!(builder.com_port.as_deref(), Some("/dev/ttyUSB0"));
    }
}
