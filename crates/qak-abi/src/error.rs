//! Boundary-layer error types.

use std::fmt;

use thiserror::Error;

use crate::handle::ModuleHandle;

/// Errors raised while talking to the engine.
///
/// Compilation diagnostics are not errors; they come back as data from
/// [`Session::get_diagnostics`](crate::Session::get_diagnostics).
#[derive(Debug, Error)]
pub enum AbiError {
    /// A read or write fell outside linear memory.
    #[error("out-of-bounds access of {len} bytes at offset {offset} (memory size {memory_size})")]
    OutOfBounds {
        offset: u32,
        len: u32,
        memory_size: u32,
    },

    /// A string record referenced bytes that are not valid UTF-8.
    #[error("invalid UTF-8 in string at offset {offset}: {source}")]
    InvalidUtf8 {
        offset: u32,
        #[source]
        source: std::str::Utf8Error,
    },

    /// A record decoded cleanly but broke a layout invariant.
    #[error("malformed {record} record at offset {offset}: {reason}")]
    MalformedRecord {
        record: &'static str,
        offset: u32,
        reason: String,
    },

    /// The engine speaks a different record layout version.
    #[error("engine ABI version {found} is not supported (expected {expected})")]
    AbiVersionMismatch { expected: u32, found: u32 },

    /// The engine trapped or rejected an entry-point call.
    #[error("engine call `{function}` failed: {message}")]
    EngineCall {
        function: &'static str,
        message: String,
    },

    /// The engine returned a null handle or null allocation.
    #[error("engine ran out of memory during {operation}")]
    ResourceExhausted { operation: &'static str },

    /// The module was deleted, or belongs to another session.
    #[error("{0} is not a live module of this session")]
    StaleModule(ModuleHandle),

    /// The session's compiler handle has been destroyed.
    #[error("compiler session is closed")]
    SessionClosed,

    /// A host string cannot be passed as a NUL-terminated native string.
    #[error("{what} contains an interior NUL byte at index {index}")]
    InteriorNul { what: &'static str, index: usize },
}

/// Broad classes of [`AbiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The engine and this layer disagree about the contract. Not recoverable.
    ProtocolViolation,
    /// The caller used a handle or session outside its lifetime, or passed
    /// input the contract cannot carry.
    Lifecycle,
    /// The engine could not allocate.
    ResourceExhausted,
}

impl AbiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfBounds { .. }
            | Self::InvalidUtf8 { .. }
            | Self::MalformedRecord { .. }
            | Self::AbiVersionMismatch { .. }
            | Self::EngineCall { .. } => ErrorKind::ProtocolViolation,
            Self::StaleModule(_) | Self::SessionClosed | Self::InteriorNul { .. } => {
                ErrorKind::Lifecycle
            }
            Self::ResourceExhausted { .. } => ErrorKind::ResourceExhausted,
        }
    }

    /// Shorthand for [`AbiError::EngineCall`].
    pub fn engine_call(function: &'static str, message: impl fmt::Display) -> Self {
        Self::EngineCall {
            function,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProtocolViolation => write!(f, "protocol violation"),
            Self::Lifecycle => write!(f, "lifecycle"),
            Self::ResourceExhausted => write!(f, "resource exhaustion"),
        }
    }
}

/// Boundary-layer result type alias.
pub type AbiResult<T> = Result<T, AbiError>;
