//! # Character Sheet Core Library
//!
//! Host-agnostic model for per-character role-playing stat sheets.
//!
//! Every participant of a chat conversation gets:
//!
//! - **Stats** — integer attributes defined by the active [`Preset`]
//!   (Strength, Charisma, Sanity, ...), persisted through a host
//!   [`SettingsStore`] under `stats_<name>`.
//! - **Title** — a narrative label ("Yuriko, the Tiger's Shadow") that lives
//!   in the in-memory [`Roster`] only.
//!
//! The host application owns the chat log, the character cards and the
//! settings object. This crate only reads them through plain data
//! ([`ChatSnapshot`]) and the settings port.
//!
//! ## Modules
//!
//! - `preset` — fixed catalog of stat schemas and clamping
//! - `roster` — ordered, de-duplicated participant list built from a chat
//! - `settings` — settings port and the typed extension-settings facade
//! - `persistence` — SQLite adapter for the settings port
//! - `config` — `charsheet.toml` configuration
//! - `metrics` — evaluation counters

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod persistence;
pub mod preset;
pub mod roster;
pub mod settings;
pub mod types;

pub use config::SheetConfig;
pub use error::SheetError;
pub use preset::{DEFAULT_PRESET_KEY, PRESETS, Preset};
pub use roster::Roster;
pub use settings::{ExtensionSettings, MemorySettings, SettingsStore};
pub use types::*;
