//! Bounded line channel over an async byte stream.
//!
//! `LineChannel` owns both halves of a connection: buffered line reads on
//! the way in, write-and-flush lines on the way out, and a liveness probe
//! that watches the stream without consuming from it. It is
//! transport-agnostic and works with any async stream (TCP, Unix, or
//! in-memory).

use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;

use crate::protocol::OtpError;

/// Line-oriented channel over a single stream.
pub struct LineChannel<S> {
    stream: BufReader<S>,
}

impl<S> LineChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Returns the underlying stream, discarding any buffered input.
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    /// Reads one newline-terminated line, stripping the terminator and any
    /// trailing carriage returns.
    ///
    /// Returns `Closed` when the stream ends before any byte of the line
    /// arrives. A stream that ends mid-line yields the partial line. A
    /// line longer than `max` bytes is a protocol error.
    pub async fn read_line(&mut self, max: usize) -> Result<String, OtpError> {
        let mut line: Vec<u8> = Vec::new();
        loop {
            let (used, done) = {
                let buf = self.stream.fill_buf().await?;
                if buf.is_empty() {
                    if line.is_empty() {
                        return Err(OtpError::Closed);
                    }
                    (0, true)
                } else if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    if line.len() + pos > max {
                        return Err(OtpError::LineTooLong { limit: max });
                    }
                    line.extend_from_slice(&buf[..pos]);
                    (pos + 1, true)
                } else {
                    if line.len() + buf.len() > max {
                        return Err(OtpError::LineTooLong { limit: max });
                    }
                    line.extend_from_slice(buf);
                    (buf.len(), false)
                }
            };
            self.stream.consume(used);
            if done {
                break;
            }
        }
        while line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Writes one line, appending the newline terminator, and flushes.
    ///
    /// A write that cannot transmit every byte surfaces as `WriteShort`.
    pub async fn write_line(&mut self, line: &str) -> Result<(), OtpError> {
        let mut out = Vec::with_capacity(line.len() + 1);
        out.extend_from_slice(line.as_bytes());
        out.push(b'\n');
        let len = out.len();
        let stream = self.stream.get_mut();
        stream.write_all(&out).await.map_err(|e| {
            if e.kind() == io::ErrorKind::WriteZero {
                OtpError::WriteShort { len }
            } else {
                OtpError::Io(e)
            }
        })?;
        stream.flush().await?;
        Ok(())
    }

    /// Point-in-time liveness probe: is the peer still there?
    ///
    /// Waits up to `wait` for the stream to become readable without
    /// consuming anything. A peer that stays quiet for the whole window
    /// counts as present; a stream that becomes readable with zero pending
    /// bytes is half-closed and counts as absent, as does any wait error.
    /// Interrupt-class errors restart the wait with the same timeout.
    pub async fn peer_present(&mut self, wait: Duration) -> bool {
        if !self.stream.buffer().is_empty() {
            return true;
        }
        loop {
            match timeout(wait, self.stream.fill_buf()).await {
                Err(_elapsed) => return true,
                Ok(Ok(buf)) => return !buf.is_empty(),
                Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                Ok(Err(_)) => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncWriteExt};

    #[tokio::test]
    async fn reads_line_and_strips_terminator() {
        let (mut tx, rx) = duplex(1024);
        let mut chan = LineChannel::new(rx);

        tx.write_all(b"hello world\r\nnext\n").await.unwrap();
        assert_eq!(chan.read_line(64).await.unwrap(), "hello world");
        assert_eq!(chan.read_line(64).await.unwrap(), "next");
    }

    #[tokio::test]
    async fn empty_line_is_not_closed() {
        let (mut tx, rx) = duplex(1024);
        let mut chan = LineChannel::new(rx);

        tx.write_all(b"\n").await.unwrap();
        assert_eq!(chan.read_line(64).await.unwrap(), "");
    }

    #[tokio::test]
    async fn closed_when_stream_ends() {
        let (tx, rx) = duplex(1024);
        drop(tx);
        let mut chan = LineChannel::new(rx);

        assert!(matches!(
            chan.read_line(64).await,
            Err(OtpError::Closed)
        ));
    }

    #[tokio::test]
    async fn partial_final_line_is_returned() {
        let (mut tx, rx) = duplex(1024);
        let mut chan = LineChannel::new(rx);

        tx.write_all(b"no terminator").await.unwrap();
        drop(tx);
        assert_eq!(chan.read_line(64).await.unwrap(), "no terminator");
    }

    #[tokio::test]
    async fn enforces_line_bound() {
        let (mut tx, rx) = duplex(1024);
        let mut chan = LineChannel::new(rx);

        tx.write_all(b"0123456789\n").await.unwrap();
        assert!(matches!(
            chan.read_line(4).await,
            Err(OtpError::LineTooLong { limit: 4 })
        ));
    }

    #[tokio::test]
    async fn line_at_exact_bound_is_accepted() {
        let (mut tx, rx) = duplex(1024);
        let mut chan = LineChannel::new(rx);

        tx.write_all(b"1234\n").await.unwrap();
        assert_eq!(chan.read_line(4).await.unwrap(), "1234");
    }

    #[tokio::test]
    async fn write_line_appends_newline() {
        let (client, server) = duplex(1024);
        let mut chan = LineChannel::new(client);
        let mut peer = LineChannel::new(server);

        chan.write_line("SERVER <|> BYE").await.unwrap();
        assert_eq!(peer.read_line(64).await.unwrap(), "SERVER <|> BYE");
    }

    #[tokio::test]
    async fn probe_present_with_pending_data() {
        let (mut tx, rx) = duplex(1024);
        let mut chan = LineChannel::new(rx);

        tx.write_all(b"data\n").await.unwrap();
        assert!(chan.peer_present(Duration::from_millis(50)).await);
        // The probe must not consume: the line is still readable.
        assert_eq!(chan.read_line(64).await.unwrap(), "data");
    }

    #[tokio::test]
    async fn probe_absent_after_close() {
        let (tx, rx) = duplex(1024);
        drop(tx);
        let mut chan = LineChannel::new(rx);

        assert!(!chan.peer_present(Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn probe_quiet_peer_counts_as_present() {
        let (_tx, rx) = duplex(1024);
        let mut chan = LineChannel::new(rx);

        assert!(chan.peer_present(Duration::from_millis(20)).await);
    }
}
