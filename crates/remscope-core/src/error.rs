use thiserror::Error;

use crate::address::RemoteAddress;
use crate::offset::DiscoveryError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    #[error("Failed to read process memory at address {address}: {message}")]
    MemoryReadFailed {
        address: RemoteAddress,
        message: String,
    },

    #[error("Failed to write process memory at address {address}: {message}")]
    MemoryWriteFailed {
        address: RemoteAddress,
        message: String,
    },

    #[error("Remote writes are disabled")]
    WritesDisabled,

    #[error("Not connected to a target process")]
    NotConnected,

    #[error("Target process {0} is no longer running")]
    ProcessLost(i32),

    #[error("Offset discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Config parse error: {0}")]
    ConfigParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn read_failed(address: RemoteAddress, message: impl Into<String>) -> Self {
        Error::MemoryReadFailed {
            address,
            message: message.into(),
        }
    }

    pub(crate) fn write_failed(address: RemoteAddress, message: impl Into<String>) -> Self {
        Error::MemoryWriteFailed {
            address,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
