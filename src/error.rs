//! Crate-wide error type and the taxonomy the outer tool layer renders into
//! its JSON-RPC error envelope.

use thiserror::Error;

/// Stable error codes handed to the (excluded) tool-dispatch layer.
///
/// These are data, not Rust types: the dispatch layer matches on the string
/// to decide how to shape its JSON-RPC error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Connection,
    Data,
    Timeout,
    InvalidInput,
    System,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Connection => "CONNECTION_ERROR",
            ErrorCode::Data => "DATA_ERROR",
            ErrorCode::Timeout => "TIMEOUT_ERROR",
            ErrorCode::InvalidInput => "INVALID_INPUT_ERROR",
            ErrorCode::System => "SYSTEM_ERROR",
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("not connected")]
    NotConnected,

    #[error("already connected on {0}")]
    AlreadyConnected(String),

    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid encoding selector: {0}")]
    InvalidEncoding(String),

    #[error("{0} must not be empty")]
    EmptyPayload(&'static str),

    #[error("missing required argument `{0}` for the chosen wait policy")]
    MissingArgument(&'static str),

    #[error("internal invariant violated: {0}")]
    System(String),
}

impl Error {
    /// Maps this error onto the stable taxonomy from the specification's
    /// error-handling design, for the tool layer to render.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Io(_) | Error::NotConnected | Error::AlreadyConnected(_) => {
                ErrorCode::Connection
            }
            Error::InvalidHex(_) | Error::InvalidEncoding(_) | Error::EmptyPayload(_) => {
                ErrorCode::Data
            }
            Error::MissingArgument(_) => ErrorCode::InvalidInput,
            Error::System(_) => ErrorCode::System,
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, Error>;
