//! Error types for the appfire library.

use std::fmt;
use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::protocol::Command;

/// The main error type for appfire operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Protocol client error outside of a refresh cycle.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// A refresh cycle or command failed.
    #[error("refresh error: {0}")]
    Refresh(#[from] RefreshError),

    /// The first refresh failed, so the stove is not usable yet.
    ///
    /// Hosts should defer setup and try again later.
    #[error("stove not ready: {0}")]
    NotReady(#[source] RefreshError),

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Desired temperature outside the range the stove accepts.
    #[error("desired temperature {value}°C outside {min}..={max}°C")]
    InvalidTemperature { value: f64, min: f64, max: f64 },
}

/// Frame-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Trailing checksum does not match the frame contents.
    #[error("checksum mismatch: expected 0x{expected:02x}, got 0x{actual:02x}")]
    Checksum { expected: u8, actual: u8 },

    /// Frame too short to contain header and checksum.
    #[error("frame too short: need at least {min} bytes, got {got}")]
    TooShort { min: usize, got: usize },

    /// First byte is not the start marker.
    #[error("invalid start byte 0x{0:02x}")]
    InvalidStart(u8),

    /// Declared payload length disagrees with the frame size.
    #[error("length mismatch: header declares {declared} payload bytes, frame carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// Message kind not part of the protocol.
    #[error("unknown message kind 0x{0:02x}")]
    UnknownKind(u8),

    /// Payload shorter than its message kind requires.
    #[error("payload for kind 0x{kind:02x} too short: need {expected} bytes, got {got}")]
    PayloadTooShort { kind: u8, expected: usize, got: usize },

    /// Field value the protocol does not allow.
    #[error("invalid value: {reason}")]
    InvalidValue { reason: String },
}

/// Errors raised by the protocol client for a single round-trip.
///
/// Cloneable so a shared refresh can hand the same error to every waiter.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// No complete reply within the I/O timeout.
    #[error("no reply within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Connection refused, unreachable or reset.
    #[error("connection to {addr} failed: {source}")]
    Connection {
        addr: String,
        #[source]
        source: Arc<io::Error>,
    },

    /// Reply frame failed checksum verification.
    #[error("checksum mismatch: expected 0x{expected:02x}, got 0x{actual:02x}")]
    Checksum { expected: u8, actual: u8 },

    /// Reply ended before the frame was complete.
    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },

    /// Reply was well-formed but not what the request calls for.
    #[error("protocol error: {message}")]
    Protocol { message: String },
}

impl ClientError {
    /// Creates a connection error for the given address.
    #[must_use]
    pub fn connection(addr: impl Into<String>, source: io::Error) -> Self {
        Self::Connection {
            addr: addr.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn timeout(timeout: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl From<FrameError> for ClientError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Checksum { expected, actual } => Self::Checksum { expected, actual },
            FrameError::TooShort { min, got } => Self::ShortRead { expected: min, got },
            FrameError::LengthMismatch { declared, actual } => Self::ShortRead {
                expected: declared,
                got: actual,
            },
            FrameError::PayloadTooShort { expected, got, .. } => {
                Self::ShortRead { expected, got }
            }
            other => Self::Protocol {
                message: other.to_string(),
            },
        }
    }
}

/// Which query of a refresh cycle failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStage {
    /// The primary status query.
    Primary,
    /// The secondary status query.
    Secondary,
}

impl fmt::Display for RefreshStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Secondary => f.write_str("secondary"),
        }
    }
}

/// Coordinator-visible failure of a refresh cycle or command.
#[derive(Debug, Clone, Error)]
pub enum RefreshError {
    /// A status query failed; nothing was published.
    #[error("failed to fetch {stage} status: {source}")]
    Fetch {
        stage: RefreshStage,
        #[source]
        source: ClientError,
    },

    /// A control command failed.
    #[error("command {command} failed: {source}")]
    Command {
        command: Command,
        #[source]
        source: ClientError,
    },

    /// The refresh task was cancelled before it finished.
    #[error("refresh cancelled")]
    Cancelled,
}

impl RefreshError {
    /// Returns the client error behind this failure, if any.
    #[must_use]
    pub const fn cause(&self) -> Option<&ClientError> {
        match self {
            Self::Fetch { source, .. } | Self::Command { source, .. } => Some(source),
            Self::Cancelled => None,
        }
    }

    /// Returns the stage that failed, for fetch errors.
    #[must_use]
    pub const fn stage(&self) -> Option<RefreshStage> {
        match self {
            Self::Fetch { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result type alias for appfire operations.
pub type Result<T> = std::result::Result<T, Error>;
