//! OTP protocol constants and field framing.

use std::io;

use thiserror::Error;

/// Version marker exchanged at session start.
///
/// The controller opens with this exact line and the scanner echoes it
/// back verbatim; any other byte sequence aborts the session.
pub const VERSION_MARKER: &str = "< OTP/2.0 >";

/// Field separator for multi-field messages (space, pipe markers, space).
pub const FIELD_SEPARATOR: &str = " <|> ";

/// Token opening and closing server-originated frames.
pub const SERVER_TOKEN: &str = "SERVER";

/// Closing line of every server frame.
pub const FRAME_END: &str = "<|> SERVER";

/// Opening line of the plugin list frame.
pub const PLUGIN_LIST_START: &str = "SERVER <|> PLUGIN_LIST <|>";

/// Opening line of the preferences frame.
pub const PREFERENCES_START: &str = "SERVER <|> PREFERENCES <|>";

/// Goodbye line sent by the termination handshake.
pub const BYE_LINE: &str = "SERVER <|> BYE <|> BYE <|> SERVER";

/// Placeholder announced when the feed version fails validation.
pub const NO_VERSION: &str = "NOVERSION";

// Per-message input bounds. Each read names its bound explicitly; a line
// past the bound is a hard protocol error, never a silent truncation.

/// Bound for the handshake line.
pub const HANDSHAKE_LINE_MAX: usize = 1024;

/// Bound for the loading-status synchronization poll.
pub const LOADING_LINE_MAX: usize = 256;

/// Bound for command-loop and sub-session input lines.
pub const COMMAND_LINE_MAX: usize = 2048;

/// Bound for lines drained during the termination handshake.
pub const DRAIN_LINE_MAX: usize = 4096;

/// Bound for a single plugin record line read by a client. Tag blobs make
/// record lines much longer than command lines.
pub const RECORD_LINE_MAX: usize = 16 * 1024;

/// OTP protocol errors.
#[derive(Debug, Error)]
pub enum OtpError {
    #[error("peer closed the connection")]
    Closed,

    #[error("short write: only part of a {len}-byte line was transmitted")]
    WriteShort { len: usize },

    #[error("input line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("protocol version mismatch: got {got:?}")]
    VersionMismatch { got: String },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Builds one protocol line from an ordered sequence of fields.
///
/// The separator is inserted here and nowhere else, so field order and the
/// exact separator bytes are enforced by the builder rather than by every
/// call site formatting strings by hand.
#[derive(Debug)]
pub struct LineBuilder {
    line: String,
}

impl LineBuilder {
    pub fn new(first: &str) -> Self {
        Self {
            line: first.to_string(),
        }
    }

    pub fn field(mut self, value: &str) -> Self {
        self.line.push_str(FIELD_SEPARATOR);
        self.line.push_str(value);
        self
    }

    pub fn finish(self) -> String {
        self.line
    }
}

/// Splits a protocol line into its ` <|> `-separated fields.
pub fn fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(FIELD_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_joins_fields_in_order() {
        let line = LineBuilder::new("SERVER")
            .field("NVT_INFO")
            .field("1234")
            .field("SERVER")
            .finish();
        assert_eq!(line, "SERVER <|> NVT_INFO <|> 1234 <|> SERVER");
    }

    #[test]
    fn builder_single_field() {
        assert_eq!(LineBuilder::new("SERVER").finish(), "SERVER");
    }

    #[test]
    fn fields_round_trip() {
        let line = LineBuilder::new("a").field("b").field("c").finish();
        let split: Vec<&str> = fields(&line).collect();
        assert_eq!(split, ["a", "b", "c"]);
    }

    #[test]
    fn bare_pipes_are_not_separators() {
        let split: Vec<&str> = fields("a<|>b <|> c").collect();
        assert_eq!(split, ["a<|>b", "c"]);
    }

    #[test]
    fn error_display_names_the_limit() {
        let err = OtpError::LineTooLong { limit: 2048 };
        assert!(err.to_string().contains("2048"));
    }
}
