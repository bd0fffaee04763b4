//! Message sources.
//!
//! Retrieving raw notifications (mailbox credentials, API calls, retries) is
//! the job of a source implementation. The core only needs the messages in
//! provider order. A source that fails delivers nothing, and the failure is a
//! whole-batch error for the caller.

use crate::{
    core::message::RawMessage,
    errors::{Error, Result},
};
use std::future::Future;
use std::path::PathBuf;
use tracing::{info, warn};

/// Anything that can deliver a batch of raw messages.
pub trait MessageSource: Send + Sync {
    /// Fetches the current batch, newest first.
    fn fetch_messages(&self) -> impl Future<Output = Result<Vec<RawMessage>>> + Send;
}

/// Reads an exported JSON array of raw messages from disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Creates a source for the given export file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MessageSource for JsonFileSource {
    async fn fetch_messages(&self) -> Result<Vec<RawMessage>> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| Error::Source {
            message: format!("Failed to read message export {:?}: {e}", self.path),
        })?;

        let entries: Vec<serde_json::Value> =
            serde_json::from_str(&contents).map_err(|e| Error::Source {
                message: format!("Failed to parse message export {:?}: {e}", self.path),
            })?;

        let (messages, skipped) = parse_messages(entries);
        if skipped > 0 {
            warn!("Skipped {} unreadable messages in {:?}", skipped, self.path);
        }

        info!("Read {} messages from {:?}", messages.len(), self.path);
        Ok(messages)
    }
}

/// Parses each exported entry on its own, dropping the ones that do not fit
/// the message model.
///
/// Returns the parsed messages in export order and the number dropped.
pub fn parse_messages(entries: Vec<serde_json::Value>) -> (Vec<RawMessage>, usize) {
    let mut messages = Vec::with_capacity(entries.len());
    let mut skipped = 0;

    for (index, entry) in entries.into_iter().enumerate() {
        let id = entry
            .get("id")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| format!("#{index}"), str::to_string);

        match serde_json::from_value::<RawMessage>(entry) {
            Ok(message) => messages.push(message),
            Err(e) => {
                warn!("Skipping message {}: {}", id, e);
                skipped += 1;
            }
        }
    }

    (messages, skipped)
}

/// A fixed batch of messages, useful when the caller already has them in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    messages: Vec<RawMessage>,
}

impl StaticSource {
    /// Creates a source that always returns `messages`.
    #[must_use]
    pub const fn new(messages: Vec<RawMessage>) -> Self {
        Self { messages }
    }
}

impl MessageSource for StaticSource {
    async fn fetch_messages(&self) -> Result<Vec<RawMessage>> {
        Ok(self.messages.clone())
    }
}
