//! Check-feed version metadata.
//!
//! The feed is the versioned bundle of all check definitions loaded into
//! the registry. Its build tag is owned by an external provider; this
//! module defines the provider boundary, a file-backed implementation,
//! and the validation every announced version must pass.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::FeedError;

/// Name of the file carrying the feed build tag inside the feed directory.
pub const FEED_INFO_FILE: &str = "plugin_feed_info.inc";

/// Provider of the loaded feed's build tag.
#[async_trait]
pub trait FeedInfo: Send + Sync {
    /// Returns the feed's PLUGIN_SET build tag.
    async fn plugin_set(&self) -> Result<String, FeedError>;
}

/// Reads the build tag from the feed info file on disk.
///
/// The file is a plain include whose `PLUGIN_SET` line embeds the tag;
/// everything but the digits on that line is decoration.
#[derive(Debug, Clone)]
pub struct FileFeedInfo {
    path: PathBuf,
}

impl FileFeedInfo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FeedInfo for FileFeedInfo {
    async fn plugin_set(&self) -> Result<String, FeedError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        content
            .lines()
            .find(|line| line.contains("PLUGIN_SET"))
            .map(|line| line.chars().filter(char::is_ascii_digit).collect())
            .ok_or(FeedError::MissingPluginSet)
    }
}

/// A feed version is valid only if it is non-empty and all ASCII digits.
pub fn is_valid_feed_version(version: &str) -> bool {
    !version.is_empty() && version.bytes().all(|b| b.is_ascii_digit())
}
