use std::io;
use thiserror::Error;

/// The primary error type for the `broadlink-lib` crate.
#[derive(Error, Debug)]
pub enum BroadlinkError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("timeout waiting for device response")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("device returned status code {code:#06x}")]
    ErrorCode { code: u16 },

    #[error("invalid response from device")]
    InvalidResponse,

    #[error("short packet: expected at least {expected} bytes, got {actual}")]
    ShortPacket { expected: usize, actual: usize },

    #[error("authentication reply carried no payload")]
    AuthFailed,

    #[error("authentication key has invalid length {len}")]
    KeyLength { len: usize },

    #[error("gave up polling after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("no key detected during RF frequency sweep")]
    NoKeyDetected,

    #[error("no RF data captured")]
    NoRfData,

    #[error("learning timed out, no data received")]
    LearningTimedOut,

    #[error("learning cancelled")]
    Cancelled,

    #[error("socket id {0} out of range 1..=4")]
    InvalidSocket(u8),

    #[error("no stored command named {0:?}")]
    UnknownCommand(String),

    #[error("corrupt command store: {0}")]
    CorruptStore(#[from] serde_json::Error),
}
