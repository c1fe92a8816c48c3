//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use thiserror::Error;

use super::ids::ChannelId;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for threadchan.
#[derive(Error, Debug)]
pub enum Error {
    /// Channel constructed with a capacity of zero (or above the configured maximum).
    #[error("invalid channel capacity: {0}")]
    InvalidCapacity(usize),

    /// Slot storage for a new channel could not be allocated.
    #[error("channel out of memory: {0}")]
    OutOfMemory(String),

    /// Send attempted against a closed channel.
    #[error("channel {0} is closed")]
    ChannelClosed(ChannelId),

    /// Identity lookup for a channel that is not live (or holds another payload type).
    #[error("unknown channel: {0}")]
    UnknownChannel(ChannelId),

    /// Invalid configuration value.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable error code for binding layers that cannot match on the enum.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidCapacity(_) => "INVALID_CAPACITY",
            Error::OutOfMemory(_) => "OUT_OF_MEMORY",
            Error::ChannelClosed(_) => "CHANNEL_CLOSED",
            Error::UnknownChannel(_) => "UNKNOWN_CHANNEL",
            Error::Config(_) => "CONFIG",
            Error::Serialization(_) => "SERIALIZATION",
            Error::Io(_) => "IO",
        }
    }
}

// Convenience constructors
impl Error {
    pub fn out_of_memory(msg: impl Into<String>) -> Self {
        Self::OutOfMemory(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::InvalidCapacity(0).kind(), "INVALID_CAPACITY");
        assert_eq!(Error::out_of_memory("slots").kind(), "OUT_OF_MEMORY");
        assert_eq!(
            Error::ChannelClosed(ChannelId::from_raw(3)).kind(),
            "CHANNEL_CLOSED"
        );
        assert_eq!(Error::config("bad").kind(), "CONFIG");
    }

    #[test]
    fn test_error_messages() {
        let err = Error::ChannelClosed(ChannelId::from_raw(7));
        assert_eq!(err.to_string(), "channel 7 is closed");

        let err = Error::InvalidCapacity(0);
        assert_eq!(err.to_string(), "invalid channel capacity: 0");
    }
}
