//! Tunables and wire-level enums for the engine, mirroring the "Defaults"
//! table and the environment-variable surface of the specification.

use std::{str::FromStr, time::Duration};

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4096;
pub const DEFAULT_PORT_READ_TIMEOUT: Duration = Duration::from_millis(20);
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_millis(100);
pub const DEFAULT_ASYNC_STORE_CAP: usize = 1000;
pub const DEFAULT_RESPONSE_BUFFER_CAP: usize = 4096;
pub const DEFAULT_SYNC_CHANNEL_CAP: usize = 256;
pub const DEFAULT_DISCONNECT_GRACE: Duration = Duration::from_millis(250);

/// Caller-declared encoding for `send_data` payloads and decoded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum Encoding {
    Utf8,
    Hex,
}

impl Default for Encoding {
    fn default() -> Self {
        Self::Utf8
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Self::Utf8),
            "hex" => Ok(Self::Hex),
            other => Err(Error::InvalidEncoding(other.to_string())),
        }
    }
}

/// The rule the synchronous `send` uses to decide it is done reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum WaitPolicy {
    Keyword,
    Timeout,
    None,
    AtCommand,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::Timeout
    }
}

impl WaitPolicy {
    pub(crate) fn name(self) -> &'static str {
        match self {
            WaitPolicy::Keyword => "keyword",
            WaitPolicy::Timeout => "timeout",
            WaitPolicy::None => "none",
            WaitPolicy::AtCommand => "at_command",
        }
    }
}

impl FromStr for WaitPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keyword" => Ok(Self::Keyword),
            "timeout" => Ok(Self::Timeout),
            "none" => Ok(Self::None),
            "at_command" | "atcommand" => Ok(Self::AtCommand),
            other => Err(Error::InvalidEncoding(other.to_string())),
        }
    }
}

/// Line parameters and internal tunables captured at `connect` time.
///
/// Persisted state is intentionally absent: every field here has a
/// specification-mandated default and is re-derived from the environment (or
/// builder overrides) on every `connect`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub baud_rate: u32,
    pub read_chunk_size: usize,
    pub port_read_timeout: Duration,
    pub idle_threshold: Duration,
    pub async_store_cap: usize,
    pub response_buffer_cap: usize,
    pub sync_channel_cap: usize,
    pub disconnect_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            port_read_timeout: DEFAULT_PORT_READ_TIMEOUT,
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            async_store_cap: DEFAULT_ASYNC_STORE_CAP,
            response_buffer_cap: DEFAULT_RESPONSE_BUFFER_CAP,
            sync_channel_cap: DEFAULT_SYNC_CHANNEL_CAP,
            disconnect_grace: DEFAULT_DISCONNECT_GRACE,
        }
    }
}

impl EngineConfig {
    /// Overlays recognized environment variables onto the defaults.
    ///
    /// A malformed value is logged and ignored rather than failing
    /// construction — the engine must always come up with *some* valid
    /// configuration.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(v) = env_usize("SERIAL_ENGINE_ASYNC_STORE_CAP") {
            cfg.async_store_cap = v;
        }
        if let Some(v) = env_usize("SERIAL_ENGINE_RESPONSE_BUFFER_CAP") {
            cfg.response_buffer_cap = v;
        }
        if let Some(v) = env_usize("SERIAL_ENGINE_SYNC_CHANNEL_CAP") {
            cfg.sync_channel_cap = v;
        }
        if let Some(v) = env_millis("SERIAL_ENGINE_IDLE_THRESHOLD_MS") {
            cfg.idle_threshold = v;
        }

        cfg
    }

    /// The `tracing` filter directive recognized from `SERIAL_ENGINE_LOG`,
    /// falling back to the crate default.
    pub fn log_filter() -> String {
        std::env::var("SERIAL_ENGINE_LOG").unwrap_or_else(|_| "info".to_string())
    }
}

fn env_usize(key: &str) -> Option<usize> {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(key, raw, "ignoring malformed environment override");
                None
            }
        },
        Err(_) => None,
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    env_usize(key).map(|ms| Duration::from_millis(ms as u64))
}
