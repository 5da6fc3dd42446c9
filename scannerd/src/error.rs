//! Error types for scannerd.

use std::io;

use thiserror::Error;

// Re-export OtpError from the otp crate
pub use otp::OtpError;

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("otp protocol error: {0}")]
    Otp(#[from] OtpError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("feed metadata error: {0}")]
    Feed(#[from] FeedError),

    #[error("unparseable client input: {line:?}")]
    ClientInput { line: String },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(io::Error),

    #[error("failed to parse config: {0}")]
    ParseError(String),

    #[error("invalid configuration: {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
}

/// Feed metadata errors.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read feed info: {0}")]
    Read(#[from] io::Error),

    #[error("feed info has no PLUGIN_SET entry")]
    MissingPluginSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::ClientInput {
            line: "CLIENT <|> BOGUS".to_string(),
        };
        assert!(err.to_string().contains("BOGUS"));
    }

    #[test]
    fn otp_error_converts() {
        let err: Error = OtpError::Closed.into();
        assert!(matches!(err, Error::Otp(OtpError::Closed)));
    }
}
