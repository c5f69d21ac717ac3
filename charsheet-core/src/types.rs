//! Core type definitions for the character sheet model.
//!
//! The chat-side types mirror what the host exposes so that a host context can
//! be deserialized straight from its JSON.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// A single stat value. Presets keep every value inside their `[min, max]`.
pub type StatValue = i32;

/// Stat name → value for one participant.
pub type StatSet = BTreeMap<String, StatValue>;

/// Settings key under which a participant's stats are stored.
#[must_use]
pub fn stats_key(name: &str) -> String {
    format!("stats_{name}")
}

/// Before/after change of a single stat across one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDelta {
    /// Stat name as defined by the preset.
    pub stat: String,
    /// Value in the pre-evaluation snapshot.
    pub old: StatValue,
    /// Value after the evaluation was merged.
    pub new: StatValue,
}

impl StatDelta {
    /// Signed change, `new - old`.
    #[must_use]
    pub fn diff(&self) -> i64 {
        i64::from(self.new) - i64::from(self.old)
    }
}

impl fmt::Display for StatDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.diff() {
            0 => write!(f, "{} {}", self.stat, self.new),
            d if d > 0 => write!(f, "{} {} (+{d})", self.stat, self.new),
            d => write!(f, "{} {} ({d})", self.stat, self.new),
        }
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// One message of the host chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker display name.
    pub name: String,
    /// Message text.
    #[serde(default, rename = "mes")]
    pub text: String,
    /// Whether the human player wrote this message.
    #[serde(default)]
    pub is_user: bool,
}

impl ChatMessage {
    /// A message spoken by a character.
    #[must_use]
    pub fn character(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            is_user: false,
        }
    }

    /// A message written by the player.
    #[must_use]
    pub fn user(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            is_user: true,
        }
    }
}

/// A character card known to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterCard {
    /// Character name.
    pub name: String,
    /// Avatar file name as stored by the host (not yet a resource path).
    #[serde(default)]
    pub avatar: Option<String>,
}

impl CharacterCard {
    /// Card without an avatar.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avatar: None,
        }
    }

    /// Attach an avatar file.
    #[must_use]
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// Resource reference of the avatar, if the card has one.
    #[must_use]
    pub fn avatar_path(&self) -> Option<String> {
        self.avatar
            .as_deref()
            .filter(|a| !a.is_empty())
            .map(|a| format!("/characters/{}", encode_uri_component(a)))
    }
}

/// Everything the host exposes about the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSnapshot {
    /// Ordered chat log.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// The character bound to the session, if any.
    #[serde(default)]
    pub primary: Option<CharacterCard>,
    /// All character cards, used to resolve avatars of chat speakers.
    #[serde(default)]
    pub characters: Vec<CharacterCard>,
    /// The player's display name. `None` means the host default, `"User"`.
    #[serde(default)]
    pub user_name: Option<String>,
}

/// Display name used when the host has none configured.
pub const DEFAULT_USER_NAME: &str = "User";

impl ChatSnapshot {
    /// The effective player name.
    #[must_use]
    pub fn user_name(&self) -> &str {
        match self.user_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => DEFAULT_USER_NAME,
        }
    }

    /// Look up a card by exact name.
    #[must_use]
    pub fn card(&self, name: &str) -> Option<&CharacterCard> {
        self.characters.iter().find(|c| c.name == name)
    }
}

// ---------------------------------------------------------------------------
// Roster entries
// ---------------------------------------------------------------------------

/// One distinct participant of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Display name, unique case-insensitively within a roster.
    pub name: String,
    /// Avatar resource reference.
    pub avatar: Option<String>,
    /// Narrative title; starts out equal to the name.
    pub title: String,
    /// Whether this is the human player.
    pub is_user: bool,
}

impl Participant {
    /// A non-player participant whose title is its name.
    #[must_use]
    pub fn character(name: impl Into<String>, avatar: Option<String>) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            avatar,
            is_user: false,
        }
    }

    /// The player entry.
    #[must_use]
    pub fn user(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            avatar: None,
            is_user: true,
        }
    }

    /// Title if set, otherwise the name.
    #[must_use]
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Characters `encodeURIComponent` leaves alone besides ASCII alphanumerics.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a path segment the way browsers' `encodeURIComponent` does.
#[must_use]
pub fn encode_uri_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}
