//! Controller-side OTP client.
//!
//! Speaks the client half of the protocol: opens the version handshake
//! and exchanges lines and frames with a scanner. Used by the integration
//! suite and by controller-side tooling.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::codec::LineChannel;
use crate::protocol::{OtpError, FRAME_END, HANDSHAKE_LINE_MAX, RECORD_LINE_MAX, VERSION_MARKER};

/// OTP client for talking to a scanner.
pub struct OtpClient<S> {
    chan: LineChannel<S>,
}

impl<S> OtpClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Connects over an established stream: sends the version marker and
    /// expects it echoed back verbatim.
    pub async fn connect(stream: S) -> Result<Self, OtpError> {
        let mut chan = LineChannel::new(stream);
        chan.write_line(VERSION_MARKER).await?;
        let echoed = chan.read_line(HANDSHAKE_LINE_MAX).await?;
        if echoed != VERSION_MARKER {
            return Err(OtpError::VersionMismatch { got: echoed });
        }
        Ok(Self { chan })
    }

    /// Sends one command line.
    pub async fn send_line(&mut self, line: &str) -> Result<(), OtpError> {
        self.chan.write_line(line).await
    }

    /// Reads one server line.
    pub async fn read_line(&mut self) -> Result<String, OtpError> {
        self.chan.read_line(RECORD_LINE_MAX).await
    }

    /// Reads server lines up to the closing frame marker, returning the
    /// lines inside the frame. The caller reads the frame opener itself.
    pub async fn read_frame(&mut self) -> Result<Vec<String>, OtpError> {
        let mut lines = Vec::new();
        loop {
            let line = self.chan.read_line(RECORD_LINE_MAX).await?;
            if line == FRAME_END {
                return Ok(lines);
            }
            lines.push(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn connect_completes_handshake() {
        let (client, server) = duplex(1024);

        let scanner = tokio::spawn(async move {
            let mut chan = LineChannel::new(server);
            let line = chan.read_line(HANDSHAKE_LINE_MAX).await.unwrap();
            assert_eq!(line, VERSION_MARKER);
            chan.write_line(VERSION_MARKER).await.unwrap();
        });

        OtpClient::connect(client).await.unwrap();
        scanner.await.unwrap();
    }

    #[tokio::test]
    async fn connect_rejects_other_version() {
        let (client, server) = duplex(1024);

        tokio::spawn(async move {
            let mut chan = LineChannel::new(server);
            chan.read_line(HANDSHAKE_LINE_MAX).await.unwrap();
            chan.write_line("< OTP/9.9 >").await.unwrap();
        });

        let result = OtpClient::connect(client).await;
        assert!(matches!(result, Err(OtpError::VersionMismatch { .. })));
    }

    #[tokio::test]
    async fn read_frame_stops_at_end_marker() {
        let (client, server) = duplex(1024);

        tokio::spawn(async move {
            let mut chan = LineChannel::new(server);
            chan.read_line(HANDSHAKE_LINE_MAX).await.unwrap();
            chan.write_line(VERSION_MARKER).await.unwrap();
            chan.write_line("first").await.unwrap();
            chan.write_line("second").await.unwrap();
            chan.write_line(FRAME_END).await.unwrap();
        });

        let mut client = OtpClient::connect(client).await.unwrap();
        let frame = client.read_frame().await.unwrap();
        assert_eq!(frame, ["first", "second"]);
    }
}
