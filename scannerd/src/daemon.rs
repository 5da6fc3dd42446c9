//! Daemon API for running scannerd.
//!
//! Provides a clean interface for serving OTP sessions with a given
//! configuration and an already-loaded plugin registry. Used by the
//! standalone binary and by the integration suite.
//!
//! # Example
//!
//! ```ignore
//! use scannerd::{Config, Daemon, Registry};
//! use tokio::net::TcpListener;
//!
//! let daemon = Daemon::new(Config::default(), registry);
//! let listener = TcpListener::bind(daemon.address()).await?;
//! daemon.listen(listener).await?;
//! ```

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, OtpError, Result};
use crate::feed::{FeedInfo, FileFeedInfo};
use crate::loading::LoadingProgress;
use crate::otp::{BasicInterpreter, Listener, Session};
use crate::prefs::Preferences;
use crate::registry::Registry;

/// A running scannerd instance.
#[derive(Clone)]
pub struct Daemon {
    registry: Arc<RwLock<Registry>>,
    prefs: Arc<Preferences>,
    feed: Arc<dyn FeedInfo>,
    loading: Arc<LoadingProgress>,
    config: Arc<Config>,
}

impl Daemon {
    /// Creates a daemon from configuration and a loaded registry, reading
    /// the feed version from the configured feed directory.
    pub fn new(config: Config, registry: Registry) -> Self {
        let feed: Arc<dyn FeedInfo> = Arc::new(FileFeedInfo::new(config.feed.info_file()));
        Self::with_feed(config, registry, feed)
    }

    /// Creates a daemon with an explicit feed-version provider.
    pub fn with_feed(config: Config, registry: Registry, feed: Arc<dyn FeedInfo>) -> Self {
        let prefs = Arc::new(config.build_preferences());
        Self {
            registry: Arc::new(RwLock::new(registry)),
            prefs,
            feed,
            loading: Arc::new(LoadingProgress::new()),
            config: Arc::new(config),
        }
    }

    /// Shared registry handle.
    pub fn registry(&self) -> Arc<RwLock<Registry>> {
        Arc::clone(&self.registry)
    }

    /// Loading progress handle, for the plugin indexer to publish into.
    pub fn loading(&self) -> Arc<LoadingProgress> {
        Arc::clone(&self.loading)
    }

    /// Daemon configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Configured listen address.
    pub fn address(&self) -> &str {
        &self.config.listener.address
    }

    /// Accepts controller connections from any listener until it closes.
    ///
    /// Spawns one task per connection. A session that ends because the
    /// controller went away is routine and only logged at debug level by
    /// the session itself; everything else is warned about.
    pub async fn listen<L>(&self, mut listener: L) -> Result<()>
    where
        L: Listener,
    {
        info!(address = %self.address(), "OTP server accepting connections");

        loop {
            match listener.accept().await {
                Ok(stream) => {
                    let daemon = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = daemon.serve(stream).await {
                            if !matches!(e, Error::Otp(OtpError::Closed)) {
                                warn!(error = %e, "OTP session error");
                            }
                        }
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    // Channel closed (StreamListener exhausted) - normal exit
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Drives one controller connection through a full session.
    ///
    /// Handshake first; while the plugin indexer is still running the
    /// session only reports loading progress and ends. Otherwise the
    /// command loop runs until the attack order arrives. No execution
    /// engine is wired in here, so the order is acknowledged by winding
    /// the session down.
    pub async fn serve<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let mut session = Session::new(
            stream,
            self.registry(),
            Arc::clone(&self.prefs),
            Arc::clone(&self.feed),
            self.config.session.probe_timeout(),
        );
        session.handshake().await?;
        if self.loading.in_progress() {
            return session.report_loading(&self.loading).await;
        }
        let mut interpreter = BasicInterpreter::new();
        session.wait_order(&mut interpreter).await?;
        info!("attack order received");
        session.terminate().await
    }
}
