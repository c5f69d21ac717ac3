//! Host lifecycle events the session subscribes to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An event published by the host's event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostEvent {
    /// The host finished starting up.
    AppReady,
    /// The user switched to another conversation (or started a new one).
    ChatChanged,
    /// A message was added to the current conversation.
    MessageReceived,
}

impl fmt::Display for HostEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AppReady => "app_ready",
            Self::ChatChanged => "chat_changed",
            Self::MessageReceived => "message_received",
        };
        f.write_str(name)
    }
}
