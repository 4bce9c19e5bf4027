//! Protocol error types.

use thiserror::Error;

/// Errors raised while decoding a frame payload.
///
/// These never cross the session boundary: the reader logs them and drops
/// the frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame is too short for the layout selected by its tag.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Tag byte not known to this decoder.
    #[error("unknown packet tag: 0x{0:02X}")]
    UnknownTag(u8),
}

/// Errors raised while normalizing a destination reference.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DestinationError {
    /// The hex string is not valid hex.
    #[error("invalid public key hex string: {0:?}")]
    InvalidHex(String),

    /// The contact record has no `public_key` field.
    #[error("contact record must have a 'public_key' field")]
    MissingPublicKey,

    /// The contact record's `public_key` is not a hex string.
    #[error("invalid public_key in contact record: {0}")]
    InvalidRecordKey(String),

    /// The key has fewer bytes than the requested prefix.
    #[error("public key too short: need {expected} bytes, got {actual}")]
    KeyTooShort {
        /// Requested prefix length.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },
}

/// Errors raised while encoding a command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The destination reference could not be normalized.
    #[error("invalid destination: {0}")]
    Destination(#[from] DestinationError),

    /// A trace path string is not a comma-separated list of hex bytes.
    #[error("invalid path format: {0}")]
    InvalidPathFormat(String),
}

impl EncodeError {
    /// Short machine-readable reason, used as the `reason` attribute of the
    /// synthesized error event.
    pub fn reason(&self) -> &'static str {
        match self {
            EncodeError::Destination(_) => "invalid_destination",
            EncodeError::InvalidPathFormat(_) => "invalid_path_format",
        }
    }
}

/// Code carried by an ERR response.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareErrorCode {
    #[error("unsupported command")]
    UnsupportedCommand,
    #[error("not found")]
    NotFound,
    #[error("table full")]
    TableFull,
    #[error("bad state")]
    BadState,
    #[error("file I/O error")]
    FileIoError,
    #[error("illegal argument")]
    IllegalArg,
    /// A code this client does not know.
    #[error("firmware error 0x{0:02X}")]
    Unknown(u8),
}

impl From<u8> for FirmwareErrorCode {
    fn from(code: u8) -> Self {
        use crate::constants::*;
        match code {
            ERR_CODE_UNSUPPORTED_CMD => Self::UnsupportedCommand,
            ERR_CODE_NOT_FOUND => Self::NotFound,
            ERR_CODE_TABLE_FULL => Self::TableFull,
            ERR_CODE_BAD_STATE => Self::BadState,
            ERR_CODE_FILE_IO_ERROR => Self::FileIoError,
            ERR_CODE_ILLEGAL_ARG => Self::IllegalArg,
            other => Self::Unknown(other),
        }
    }
}
