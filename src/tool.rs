//! Serializable request/response shapes for the external tool surface (§6).
//!
//! This module defines the wire contract only; dispatching these over
//! stdio JSON-RPC is the excluded outer layer's job. Everything here is
//! plain data, convertible to and from the [`crate::engine`] types.

use serde::{Deserialize, Serialize};

use crate::config::{Encoding, WaitPolicy};
use crate::engine::{AsyncMessages, SendArgs, SendOutcome};
use crate::error::Error;

/// One entry of `list_ports`'s output. Populated by the host OS's device
/// enumeration; the engine itself never inspects these beyond surfacing
/// them, which is a deliberate pass-through (see the purpose section's
/// non-goals).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortInfo {
    pub port: String,
    pub description: String,
    pub hardware_id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionAction {
    Open,
    Close,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigureConnectionInput {
    pub action: ConnectionAction,
    pub port: Option<String>,
    pub baudrate: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigureConnectionOutput {
    pub message: String,
    pub port: Option<String>,
    pub baudrate: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendDataInput {
    pub payload: String,
    pub encoding: Encoding,
    pub wait_policy: WaitPolicy,
    pub stop_pattern: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl From<SendDataInput> for SendArgs {
    fn from(input: SendDataInput) -> Self {
        SendArgs {
            payload: input.payload,
            encoding: input.encoding,
            wait_policy: input.wait_policy,
            stop_pattern: input.stop_pattern,
            timeout_ms: input.timeout_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendDataOutput {
    pub data: String,
    pub raw_data: String,
    pub is_hex: bool,
    pub found_stop_pattern: Option<bool>,
    pub bytes_received: usize,
    pub pending_async_count: usize,
    pub truncated: bool,
}

impl From<SendOutcome> for SendDataOutput {
    fn from(outcome: SendOutcome) -> Self {
        SendDataOutput {
            data: outcome.data_text,
            raw_data: crate::codec::format_hex(&outcome.raw_bytes),
            is_hex: outcome.is_hex,
            found_stop_pattern: outcome.matched_stop_pattern,
            bytes_received: outcome.bytes_received,
            pending_async_count: outcome.pending_async_count,
            truncated: outcome.truncated,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AsyncMessageOutput {
    pub data: String,
    pub raw_data: String,
    pub is_hex: bool,
    pub timestamp_ms_ago: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadAsyncMessagesOutput {
    pub data: Vec<AsyncMessageOutput>,
    pub count: usize,
    pub dropped: u64,
}

impl From<AsyncMessages> for ReadAsyncMessagesOutput {
    fn from(drained: AsyncMessages) -> Self {
        let data: Vec<AsyncMessageOutput> = drained
            .messages
            .into_iter()
            .map(|m| AsyncMessageOutput {
                raw_data: if m.is_hex {
                    m.text.clone()
                } else {
                    crate::codec::format_hex(m.text.as_bytes())
                },
                data: m.text,
                is_hex: m.is_hex,
                timestamp_ms_ago: m.timestamp_ms_ago,
            })
            .collect();
        let count = data.len();
        ReadAsyncMessagesOutput {
            data,
            count,
            dropped: drained.dropped,
        }
    }
}

/// Typed error envelope returned on any tool-surface failure.
#[derive(Debug, Clone, Serialize)]
pub struct ToolError {
    pub error_message: String,
    pub error_code: &'static str,
}

impl From<&Error> for ToolError {
    fn from(err: &Error) -> Self {
        ToolError {
            error_message: err.to_string(),
            error_code: err.code().as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_outcome_maps_truncated_and_pending_fields() {
        let outcome = SendOutcome {
            raw_bytes: bytes::Bytes::from_static(b"OK\r\n"),
            data_text: "OK\r\n".to_string(),
            is_hex: false,
            matched_stop_pattern: Some(true),
            bytes_received: 4,
            truncated: false,
            pending_async_count: 2,
        };
        let output: SendDataOutput = outcome.into();
        assert_eq!(output.raw_data, "4f 4b 0d 0a");
        assert_eq!(output.pending_async_count, 2);
        assert_eq!(output.found_stop_pattern, Some(true));
    }

    #[test]
    fn tool_error_carries_stable_code_string() {
        let err = Error::NotConnected;
        let tool_err: ToolError = (&err).into();
        assert_eq!(tool_err.error_code, "CONNECTION_ERROR");
    }

    #[test]
    fn send_data_input_deserializes_from_json_envelope() {
        let raw = r#"{
            "payload": "AT+CSQ\r\n",
            "encoding": "Utf8",
            "wait_policy": "AtCommand",
            "stop_pattern": null,
            "timeout_ms": 2000
        }"#;
        let input: SendDataInput = serde_json::from_str(raw).unwrap();
        assert_eq!(input.timeout_ms, Some(2000));
        assert_eq!(input.encoding, Encoding::Utf8);
    }
}
