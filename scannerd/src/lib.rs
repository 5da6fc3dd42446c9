//! scannerd: OTP session-control layer for a vulnerability scanner.
//!
//! One scannerd session spans handshake to termination over a single
//! controller connection: it negotiates the protocol version, reports
//! loading progress while plugins are still being indexed, exchanges
//! plugin metadata and scanner preferences, applies the controller's
//! plugin selection, and waits for the attack order.
//!
//! # Library Usage
//!
//! The primary API for running scannerd is the [`Daemon`] struct:
//!
//! ```ignore
//! use scannerd::{Config, Daemon, Registry};
//!
//! let daemon = Daemon::new(Config::default(), registry);
//! daemon.listen(listener).await?;
//! ```

pub mod config;
pub mod daemon;
pub mod error;
pub mod feed;
pub mod format;
pub mod loading;
pub mod otp;
pub mod prefs;
pub mod registry;

pub use config::{Config, FeedConfig, ListenerConfig, SessionConfig};
pub use daemon::Daemon;
pub use error::{ConfigError, Error, FeedError, OtpError, Result};
pub use feed::{is_valid_feed_version, FeedInfo, FileFeedInfo};
pub use format::plugin_line;
pub use loading::LoadingProgress;
pub use crate::otp::{BasicInterpreter, Interpreter, Listener, Session, StreamListener, Verdict};
pub use prefs::{PrefEntry, PrefValue, Preferences};
pub use registry::{Category, LaunchState, PluginRecord, Registry};
