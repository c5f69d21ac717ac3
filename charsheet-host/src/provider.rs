//! Chat/session context port.
//!
//! The host owns the chat log and the character cards. The session only ever
//! reads a [`ChatSnapshot`] of them, taken fresh on every call.

use std::path::Path;

use charsheet_core::types::{ChatMessage, ChatSnapshot};
use parking_lot::Mutex;

/// Read access to the host's current chat state.
pub trait SessionProvider: Send + Sync {
    /// The chat as it is right now.
    fn snapshot(&self) -> ChatSnapshot;
}

/// A provider backed by a snapshot held in memory.
///
/// Used by the CLI (loaded from a JSON file) and by tests that play a chat
/// forward message by message.
#[derive(Debug, Default)]
pub struct StaticProvider {
    state: Mutex<ChatSnapshot>,
}

impl StaticProvider {
    /// Provider serving `snapshot`.
    #[must_use]
    pub fn new(snapshot: ChatSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }

    /// Load a snapshot from a JSON file.
    ///
    /// # Errors
    /// Fails if the file cannot be read or is not a valid chat snapshot.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let snapshot: ChatSnapshot = serde_json::from_str(&text)?;
        Ok(Self::new(snapshot))
    }

    /// Replace the whole chat, as when the host switches conversations.
    pub fn replace(&self, snapshot: ChatSnapshot) {
        *self.state.lock() = snapshot;
    }

    /// Append one message to the chat log.
    pub fn push_message(&self, message: ChatMessage) {
        self.state.lock().messages.push(message);
    }

    /// Number of messages in the chat log.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.state.lock().messages.len()
    }
}

impl SessionProvider for StaticProvider {
    fn snapshot(&self) -> ChatSnapshot {
        self.state.lock().clone()
    }
}
