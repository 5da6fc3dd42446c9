//! Scanner-side OTP session driver.
//!
//! A `Session` spans handshake to termination over one controller
//! connection. It is transport-agnostic and works with any async stream
//! (TCP, Unix, or in-memory). The command language itself lives behind
//! the [`Interpreter`] boundary; this driver owns the phases around it
//! and the send operations interpreters answer with.

use std::sync::Arc;
use std::time::Duration;

use otp::{
    LineBuilder, LineChannel, OtpError, BYE_LINE, COMMAND_LINE_MAX, DRAIN_LINE_MAX,
    FIELD_SEPARATOR, FRAME_END, HANDSHAKE_LINE_MAX, LOADING_LINE_MAX, NO_VERSION,
    PLUGIN_LIST_START, PREFERENCES_START, SERVER_TOKEN, VERSION_MARKER,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::interpreter::{Interpreter, Verdict};
use crate::error::{Error, Result};
use crate::feed::{is_valid_feed_version, FeedInfo};
use crate::format::plugin_line;
use crate::loading::LoadingProgress;
use crate::prefs::Preferences;
use crate::registry::Registry;

/// One handshake-to-termination session with a controller.
pub struct Session<S> {
    chan: LineChannel<S>,
    registry: Arc<RwLock<Registry>>,
    prefs: Arc<Preferences>,
    feed: Arc<dyn FeedInfo>,
    probe_timeout: Duration,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(
        stream: S,
        registry: Arc<RwLock<Registry>>,
        prefs: Arc<Preferences>,
        feed: Arc<dyn FeedInfo>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            chan: LineChannel::new(stream),
            registry,
            prefs,
            feed,
            probe_timeout,
        }
    }

    /// Shared registry handle, for interpreters applying a selection.
    pub fn registry(&self) -> Arc<RwLock<Registry>> {
        Arc::clone(&self.registry)
    }

    /// Reads one command-sized input line. Interpreters that consume
    /// multi-line payloads read through this.
    pub async fn read_command_line(&mut self) -> std::result::Result<String, OtpError> {
        self.chan.read_line(COMMAND_LINE_MAX).await
    }

    /// Negotiates the protocol version with a freshly connected
    /// controller.
    ///
    /// The opening line must equal the version marker byte for byte; on a
    /// match it is echoed back verbatim, otherwise the session fails
    /// without any response.
    pub async fn handshake(&mut self) -> Result<()> {
        let line = self.chan.read_line(HANDSHAKE_LINE_MAX).await.map_err(|e| {
            warn!("failed reading client-requested protocol version");
            Error::from(e)
        })?;
        if line != VERSION_MARKER {
            warn!(got = %line, "unknown client-requested protocol version");
            return Err(OtpError::VersionMismatch { got: line }.into());
        }
        self.chan.write_line(VERSION_MARKER).await?;
        Ok(())
    }

    /// Answers a controller's synchronization poll while plugins are
    /// still being indexed, then drains whatever else the controller
    /// sends.
    ///
    /// The poll line's content is ignored. Once the status line is out,
    /// read failures are an ordinary end of this phase, not a session
    /// failure.
    pub async fn report_loading(&mut self, progress: &LoadingProgress) -> Result<()> {
        self.chan.read_line(LOADING_LINE_MAX).await.map_err(|e| {
            warn!("failed reading client input");
            Error::from(e)
        })?;
        let status = LineBuilder::new("SCANNER_LOADING")
            .field(&progress.current().to_string())
            .field(&progress.total().to_string())
            .finish();
        self.chan.write_line(&status).await?;
        while self.chan.read_line(LOADING_LINE_MAX).await.is_ok() {}
        Ok(())
    }

    /// Waits for the controller's attack order, feeding every input line
    /// (empty ones included) to the command interpreter.
    ///
    /// Ends successfully when the interpreter reports the run order. A
    /// closed transport, an absent peer behind an empty line, or an
    /// interpreter rejection ends the session with an error.
    pub async fn wait_order<I>(&mut self, interpreter: &mut I) -> Result<()>
    where
        I: Interpreter<S> + Send,
    {
        loop {
            let line = match self.chan.read_line(COMMAND_LINE_MAX).await {
                Ok(line) => line,
                Err(OtpError::Closed) => {
                    info!("client closed the communication");
                    return Err(OtpError::Closed.into());
                }
                Err(e) => return Err(e.into()),
            };
            if line.is_empty() && !self.chan.peer_present(self.probe_timeout).await {
                info!("client not present");
                return Err(OtpError::Closed.into());
            }
            match interpreter.interpret(self, &line).await? {
                Verdict::RunOrder => return Ok(()),
                Verdict::Continue => {}
                Verdict::Reject => {
                    warn!(line = %line, "client input parsing error");
                    return Err(Error::ClientInput { line });
                }
            }
        }
    }

    /// Says goodbye and drains the controller's remaining input.
    ///
    /// Must be called at the end of a session. The drain is bounded by
    /// the peer's own behavior: it stops as soon as the liveness probe
    /// reports the peer gone, a read fails, or the peer sends an empty
    /// line.
    pub async fn terminate(&mut self) -> Result<()> {
        self.chan.write_line(BYE_LINE).await?;
        while self.chan.peer_present(self.probe_timeout).await {
            match self.chan.read_line(DRAIN_LINE_MAX).await {
                Ok(line) if line.is_empty() => return Ok(()),
                Ok(_) => {}
                Err(_) => return Ok(()),
            }
        }
        Ok(())
    }

    /// Announces the feed version, then serves COMPLETE_LIST and
    /// PLUGIN_INFO requests until the controller sends anything else.
    ///
    /// A version that fails validation, or a provider failure, is
    /// announced as the placeholder instead. PLUGIN_INFO requests missing
    /// their delimiters, or the terminator after the OID, are dropped and
    /// the sub-session keeps going.
    pub async fn send_nvt_info(&mut self) -> Result<()> {
        let version = match self.feed.plugin_set().await {
            Ok(version) if is_valid_feed_version(&version) => version,
            Ok(version) => {
                warn!(version = %version, "feed version failed validation");
                NO_VERSION.to_string()
            }
            Err(e) => {
                warn!(error = %e, "feed version unavailable");
                NO_VERSION.to_string()
            }
        };
        let announce = LineBuilder::new(SERVER_TOKEN)
            .field("NVT_INFO")
            .field(&version)
            .field(SERVER_TOKEN)
            .finish();
        self.chan.write_line(&announce).await?;

        loop {
            let line = match self.chan.read_line(COMMAND_LINE_MAX).await {
                Ok(line) => line,
                Err(OtpError::Closed) => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            if line.contains("COMPLETE_LIST") {
                self.send_plugin_list().await?;
            } else if line.contains("PLUGIN_INFO") {
                let Some(oid) = plugin_info_oid(&line) else {
                    continue;
                };
                self.send_plugin_info(oid).await?;
            } else {
                return Ok(());
            }
        }
    }

    /// Streams every transmittable plugin record, framed as PLUGIN_LIST.
    pub async fn send_plugin_list(&mut self) -> Result<()> {
        self.chan.write_line(PLUGIN_LIST_START).await?;
        let registry = self.registry.read().await;
        for record in registry.iter() {
            if let Some(line) = plugin_line(record) {
                self.chan.write_line(&line).await?;
            }
        }
        drop(registry);
        self.chan.write_line(FRAME_END).await?;
        Ok(())
    }

    /// Sends the record for a single OID, if it exists and is
    /// transmittable. Unknown OIDs and an empty registry are no-ops.
    pub async fn send_plugin_info(&mut self, oid: &str) -> Result<()> {
        let line = {
            let registry = self.registry.read().await;
            registry.find(oid).and_then(plugin_line)
        };
        if let Some(line) = line {
            self.chan.write_line(&line).await?;
        }
        Ok(())
    }

    /// Streams the exportable scanner preferences.
    pub async fn send_preferences(&mut self) -> Result<()> {
        self.chan.write_line(PREFERENCES_START).await?;
        for (key, value) in self.prefs.exportable() {
            let line = LineBuilder::new(key).field(value).finish();
            self.chan.write_line(&line).await?;
        }
        self.chan.write_line(FRAME_END).await?;
        Ok(())
    }
}

/// Extracts the OID from a PLUGIN_INFO request: the text after the second
/// field separator, up to the first space. A request with fewer than two
/// separators, or with nothing after the OID, has no extractable OID.
fn plugin_info_oid(line: &str) -> Option<&str> {
    let (_, rest) = line.split_once(FIELD_SEPARATOR)?;
    let (_, rest) = rest.split_once(FIELD_SEPARATOR)?;
    let end = rest.find(' ')?;
    Some(&rest[..end])
}
