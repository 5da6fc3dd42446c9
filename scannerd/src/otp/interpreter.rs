//! Command interpreter boundary for the session loop.

use async_trait::async_trait;
use otp::{OtpError, FIELD_SEPARATOR};
use tokio::io::{AsyncRead, AsyncWrite};

use super::session::Session;
use crate::error::Result;

/// Outcome of interpreting one controller line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep reading commands.
    Continue,
    /// The attack order arrived; the command loop ends successfully.
    RunOrder,
    /// The line is unparseable; the session fails.
    Reject,
}

/// Interprets controller command lines.
///
/// The session loop hands every input line (empty ones included) to the
/// interpreter and acts on its verdict. Interpreters answer through the
/// session's send operations and may read follow-up lines for multi-line
/// payloads.
#[async_trait]
pub trait Interpreter<S>: Send
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn interpret(&mut self, session: &mut Session<S>, line: &str) -> Result<Verdict>;
}

/// Minimal interpreter covering the session-control commands.
///
/// Understands the NVT_INFO and PREFERENCES exchanges and the attack
/// order; any other non-empty line is rejected. Scan targets and the
/// wider command language belong to the execution engine, not here.
#[derive(Debug, Default)]
pub struct BasicInterpreter {
    /// Preferences received from the controller, in arrival order.
    client_prefs: Vec<(String, String)>,
}

impl BasicInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client_prefs(&self) -> &[(String, String)] {
        &self.client_prefs
    }

    /// Ingests the controller's preference block, ending at its closing
    /// frame marker, then applies the plugin selection and echoes the
    /// scanner preferences back.
    ///
    /// A `plugin_set` preference names the plugins to run; a block
    /// without one selects everything.
    async fn read_preferences<S>(&mut self, session: &mut Session<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        loop {
            let line = match session.read_command_line().await {
                Ok(line) => line,
                Err(OtpError::Closed) => break,
                Err(e) => return Err(e.into()),
            };
            if line.contains("<|> CLIENT") {
                break;
            }
            let Some((key, value)) = line.split_once(FIELD_SEPARATOR) else {
                continue;
            };
            self.client_prefs
                .push((key.trim().to_string(), value.to_string()));
        }

        let plugin_set = self
            .client_prefs
            .iter()
            .rev()
            .find(|(key, _)| key == "plugin_set")
            .map(|(_, value)| value.clone());
        {
            let registry = session.registry();
            let mut registry = registry.write().await;
            registry.apply_selection(plugin_set.as_deref());
        }
        session.send_preferences().await
    }
}

#[async_trait]
impl<S> Interpreter<S> for BasicInterpreter
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn interpret(&mut self, session: &mut Session<S>, line: &str) -> Result<Verdict> {
        if line.is_empty() {
            return Ok(Verdict::Continue);
        }
        if line.contains("NVT_INFO") {
            session.send_nvt_info().await?;
            return Ok(Verdict::Continue);
        }
        if line.contains("PREFERENCES") {
            self.read_preferences(session).await?;
            return Ok(Verdict::Continue);
        }
        if line.contains("ATTACK") {
            return Ok(Verdict::RunOrder);
        }
        Ok(Verdict::Reject)
    }
}
