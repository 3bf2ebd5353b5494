use crate::network::SocketError;
use std::{io, time::Duration};
use thiserror::Error;

/// Failures while turning wire bytes into packets or option values.
///
/// Variants are compared by kind; none of them carry borrowed data so a
/// decode error can be cloned into logs and test assertions freely.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("short buffer: needed {needed} byte(s), {remaining} remaining")]
    ShortBuffer { needed: usize, remaining: usize },

    #[error("{0} trailing byte(s) after value")]
    TrailingData(usize),

    #[error("invalid magic cookie {0:02x?}")]
    InvalidMagicCookie([u8; 4]),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("invalid length {length} for option {option}")]
    InvalidLength { option: String, length: usize },

    #[error("invalid value for option {option}: {reason}")]
    InvalidValue { option: String, reason: String },

    #[error("invalid label: {0}")]
    InvalidLabel(String),

    #[error("packet too short: need at least {needed} bytes, got {length}")]
    PacketTooShort { needed: usize, length: usize },

    #[error("relay message does not carry a Relay-Message option")]
    MissingRelayMessage,

    #[error("relay nesting deeper than {0} levels")]
    RelayDepthExceeded(usize),

    #[error("message is not a relay message")]
    NotARelay,
}

impl DecodeError {
    pub(crate) fn length(option: impl Into<String>, length: usize) -> Self {
        DecodeError::InvalidLength {
            option: option.into(),
            length,
        }
    }

    pub(crate) fn value(option: impl Into<String>, reason: impl Into<String>) -> Self {
        DecodeError::InvalidValue {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

/// Precondition violations raised by the message builders.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing required option: {0}")]
    MissingOption(&'static str),

    #[error("expected {expected} message, got {got}")]
    UnexpectedMessageType { expected: String, got: String },

    #[error("hardware address of {0} bytes does not fit the 16-byte chaddr field")]
    InvalidHardwareAddress(usize),

    #[error("relay hop count {0} reached the limit")]
    HopCountExceeded(u8),
}

impl BuildError {
    pub(crate) fn unexpected(expected: impl ToString, got: impl ToString) -> Self {
        BuildError::UnexpectedMessageType {
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Socket operation failed")]
    Socket(#[from] SocketError),

    #[error("I/O error")]
    Io(#[from] io::Error),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("failed to decode packet")]
    Decode(#[from] DecodeError),

    #[error("failed to build message")]
    Build(#[from] BuildError),

    #[error("server declined the request")]
    Nak,

    #[error("server returned status {0}")]
    ServerStatus(String),

    #[error("client is closed")]
    Closed,

    #[error("Failed to parse MAC address: {0}")]
    MacParse(String),

    #[error("Interface '{0}' not found or has no usable address")]
    InterfaceInvalid(String),
}

impl ClientError {
    /// True when the peer simply did not answer in time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout(_))
    }
}
