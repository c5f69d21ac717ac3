//! Roster building — the ordered list of distinct conversation participants.
//!
//! Order policy:
//! 1. The primary character first (unless it collides with the player name).
//! 2. Other speakers in first-appearance order from non-user messages.
//! 3. The player last, always exactly once.
//!
//! Uniqueness is case-insensitive and the first occurrence decides casing.

use std::collections::HashSet;

use tracing::debug;

use crate::types::{ChatSnapshot, Participant};

/// Build a fresh participant list from the host's chat state.
#[must_use]
pub fn build_roster(snapshot: &ChatSnapshot) -> Vec<Participant> {
    let user_name = snapshot.user_name();
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(user_name.to_lowercase());

    let mut entries = Vec::new();

    if let Some(primary) = &snapshot.primary {
        if !primary.name.is_empty() && seen.insert(primary.name.to_lowercase()) {
            entries.push(Participant::character(
                primary.name.clone(),
                primary.avatar_path(),
            ));
        }
    }

    for msg in &snapshot.messages {
        if msg.is_user || msg.name.is_empty() {
            continue;
        }
        if !seen.insert(msg.name.to_lowercase()) {
            continue;
        }
        let avatar = snapshot.card(&msg.name).and_then(|c| c.avatar_path());
        entries.push(Participant::character(msg.name.clone(), avatar));
    }

    entries.push(Participant::user(user_name));
    entries
}

/// The participants of the current session plus the index being viewed.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Vec<Participant>,
    view_index: usize,
}

impl Roster {
    /// An empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the roster from the host's chat state.
    ///
    /// The view index is kept unless it fell out of bounds, in which case it
    /// goes back to the first entry. Titles already assigned to participants
    /// that are still present carry over.
    pub fn rebuild(&mut self, snapshot: &ChatSnapshot) {
        let mut entries = build_roster(snapshot);
        for entry in &mut entries {
            if let Some(old) = self.entries.iter().find(|p| p.name == entry.name) {
                entry.title.clone_from(&old.title);
            }
        }
        self.entries = entries;
        if self.view_index >= self.entries.len() {
            self.view_index = 0;
        }
        debug!(
            participants = self.entries.len(),
            view_index = self.view_index,
            "Roster rebuilt"
        );
    }

    /// Start over for a different conversation: no carried titles, view at 0.
    pub fn reset(&mut self, snapshot: &ChatSnapshot) {
        self.entries = build_roster(snapshot);
        self.view_index = 0;
        debug!(participants = self.entries.len(), "Roster reset");
    }

    /// All participants in order.
    #[must_use]
    pub fn entries(&self) -> &[Participant] {
        &self.entries
    }

    /// Number of participants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the roster has no participants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the participant being viewed.
    #[must_use]
    pub fn view_index(&self) -> usize {
        self.view_index
    }

    /// Point the view at `index`. Out-of-range indices are ignored.
    pub fn set_view_index(&mut self, index: usize) -> bool {
        if index < self.entries.len() {
            self.view_index = index;
            true
        } else {
            false
        }
    }

    /// The participant being viewed.
    #[must_use]
    pub fn current(&self) -> Option<&Participant> {
        self.entries.get(self.view_index)
    }

    /// Move the view forward, wrapping at the end.
    pub fn navigate_next(&mut self) -> Option<&Participant> {
        if self.entries.is_empty() {
            return None;
        }
        self.view_index = (self.view_index + 1) % self.entries.len();
        self.current()
    }

    /// Move the view back, wrapping at the start.
    pub fn navigate_prev(&mut self) -> Option<&Participant> {
        if self.entries.is_empty() {
            return None;
        }
        let len = self.entries.len();
        self.view_index = (self.view_index + len - 1) % len;
        self.current()
    }

    /// View the first participant again.
    pub fn reset_view(&mut self) {
        self.view_index = 0;
    }

    /// Participant with exactly this name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Participant> {
        self.entries.iter().find(|p| p.name == name)
    }

    /// Overwrite the title of the participant with exactly this name.
    ///
    /// Returns `false` if no such participant exists.
    pub fn set_title(&mut self, name: &str, title: impl Into<String>) -> bool {
        match self.entries.iter_mut().find(|p| p.name == name) {
            Some(entry) => {
                entry.title = title.into();
                true
            }
            None => false,
        }
    }
}
