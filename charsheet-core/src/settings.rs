//! Settings port and the typed view over the extension's settings namespace.
//!
//! The host owns one mutable key/value object per extension. Its shape is:
//!
//! ```text
//! {
//!   "_enabled": bool,            // evaluation on/off, default true
//!   "_presetKey": string,        // active preset, default "dnd"
//!   "_panelCollapsed": bool,     // panel UI state
//!   "stats_<name>": { "<stat>": number, ... }
//! }
//! ```
//!
//! Writes are last-writer-wins; nothing here is transactional.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::Result;
use crate::preset::{self, Preset};
use crate::types::{StatSet, StatValue, stats_key};

/// Key of the evaluation on/off flag.
pub const ENABLED_KEY: &str = "_enabled";
/// Key of the selected preset.
pub const PRESET_KEY: &str = "_presetKey";
/// Key of the panel collapsed flag.
pub const PANEL_COLLAPSED_KEY: &str = "_panelCollapsed";

/// Persistence capability offered by the host.
pub trait SettingsStore: Send {
    /// Read a value.
    fn get(&self, key: &str) -> Option<Value>;

    /// Write a value in memory. Nothing is durable until [`save`](Self::save).
    fn set(&mut self, key: &str, value: Value);

    /// Flush pending writes.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be written.
    fn save(&mut self) -> Result<()>;
}

/// Plain in-memory store. `save` only counts calls.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: BTreeMap<String, Value>,
    saves: u64,
}

impl MemorySettings {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated from a JSON object; non-objects yield an empty store.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        let values = match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        Self { values, saves: 0 }
    }

    /// How many times `save` was called.
    #[must_use]
    pub fn save_count(&self) -> u64 {
        self.saves
    }

    /// The whole namespace as one JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.values.clone().into_iter().collect())
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn save(&mut self) -> Result<()> {
        self.saves += 1;
        Ok(())
    }
}

/// Typed accessors over a [`SettingsStore`].
pub struct ExtensionSettings {
    store: Box<dyn SettingsStore>,
}

impl std::fmt::Debug for ExtensionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionSettings")
            .field("enabled", &self.is_enabled())
            .field("preset", &self.selected_preset_key())
            .finish_non_exhaustive()
    }
}

impl ExtensionSettings {
    /// Wrap a store.
    pub fn new(store: impl SettingsStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Wrap an already boxed store.
    #[must_use]
    pub fn from_boxed(store: Box<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &dyn SettingsStore {
        self.store.as_ref()
    }

    /// Whether evaluation is enabled. Anything but an explicit `false` is on.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(self.store.get(ENABLED_KEY), Some(Value::Bool(false)))
    }

    /// Turn evaluation on or off.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.store.set(ENABLED_KEY, Value::Bool(enabled));
    }

    /// The stored preset key, or the default key when unset.
    #[must_use]
    pub fn selected_preset_key(&self) -> String {
        self.store
            .get(PRESET_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| preset::DEFAULT_PRESET_KEY.to_string())
    }

    /// Select a preset by key.
    ///
    /// # Errors
    /// Returns [`SheetError::UnknownPreset`](crate::SheetError::UnknownPreset)
    /// for keys outside the catalog; the stored key is left unchanged.
    pub fn set_selected_preset_key(&mut self, key: &str) -> Result<&'static Preset> {
        let preset = preset::require(key)?;
        self.store.set(PRESET_KEY, Value::String(key.to_string()));
        debug!(preset = key, "Preset selected");
        Ok(preset)
    }

    /// The active preset, falling back to the default for unknown keys.
    #[must_use]
    pub fn active_preset(&self) -> &'static Preset {
        preset::resolve(Some(&self.selected_preset_key()))
    }

    /// Whether the panel is collapsed.
    #[must_use]
    pub fn panel_collapsed(&self) -> bool {
        matches!(self.store.get(PANEL_COLLAPSED_KEY), Some(Value::Bool(true)))
    }

    /// Persist the panel collapsed flag.
    pub fn set_panel_collapsed(&mut self, collapsed: bool) {
        self.store.set(PANEL_COLLAPSED_KEY, Value::Bool(collapsed));
    }

    /// Stats of `name` under `preset`.
    ///
    /// Missing stats are filled from the preset defaults and written back.
    /// Values stored under other presets are kept untouched so switching
    /// presets back and forth loses nothing.
    pub fn stats_for(&mut self, name: &str, preset: &Preset) -> StatSet {
        let key = stats_key(name);
        let mut object = self.stats_object(&key);
        let mut filled = false;
        let mut stats = StatSet::new();

        for def in preset.stats {
            let value = match object.get(def.name).and_then(read_number) {
                Some(raw) => preset.clamp_raw(raw),
                None => {
                    object.insert(def.name.to_string(), Value::from(def.default));
                    filled = true;
                    def.default
                }
            };
            stats.insert(def.name.to_string(), value);
        }

        if filled {
            self.store.set(&key, Value::Object(object));
        }
        stats
    }

    /// Stored stats of `name` without filling defaults.
    #[must_use]
    pub fn stored_stats(&self, name: &str) -> StatSet {
        let mut stats = StatSet::new();
        for (stat, value) in self.stats_object(&stats_key(name)) {
            match read_number(&value) {
                Some(raw) => {
                    #[allow(clippy::cast_possible_truncation)]
                    let rounded = raw.round() as StatValue;
                    stats.insert(stat, rounded);
                }
                None => warn!(participant = name, stat = %stat, "Ignoring non-numeric stored stat"),
            }
        }
        stats
    }

    /// Clamp `value` into the preset range and store it. Returns what was stored.
    pub fn set_stat(&mut self, name: &str, stat: &str, value: StatValue, preset: &Preset) -> StatValue {
        let clamped = preset.clamp(value);
        self.write_stat(name, stat, clamped);
        clamped
    }

    /// Store an already-validated value as is.
    pub fn write_stat(&mut self, name: &str, stat: &str, value: StatValue) {
        let key = stats_key(name);
        let mut object = self.stats_object(&key);
        object.insert(stat.to_string(), Value::from(value));
        self.store.set(&key, Value::Object(object));
    }

    /// Flush to the host.
    ///
    /// # Errors
    /// Propagates the store's save error.
    pub fn save(&mut self) -> Result<()> {
        self.store.save()
    }

    fn stats_object(&self, key: &str) -> Map<String, Value> {
        match self.store.get(key) {
            Some(Value::Object(map)) => map,
            Some(other) => {
                warn!(key, value = %other, "Stat entry is not an object, starting over");
                Map::new()
            }
            None => Map::new(),
        }
    }
}

fn read_number(value: &Value) -> Option<f64> {
    value.as_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> ExtensionSettings {
        ExtensionSettings::new(MemorySettings::new())
    }

    #[test]
    fn enabled_defaults_to_true() {
        let mut s = settings();
        assert!(s.is_enabled());
        s.set_enabled(false);
        assert!(!s.is_enabled());
        s.set_enabled(true);
        assert!(s.is_enabled());
    }

    #[test]
    fn non_bool_enabled_counts_as_enabled() {
        let s = ExtensionSettings::new(MemorySettings::from_json(json!({"_enabled": "no"})));
        assert!(s.is_enabled());
    }

    #[test]
    fn preset_key_defaults_and_falls_back() {
        let s = ExtensionSettings::new(MemorySettings::from_json(json!({"_presetKey": "gurps"})));
        assert_eq!(s.selected_preset_key(), "gurps");
        assert_eq!(s.active_preset().key, "dnd");

        let s = settings();
        assert_eq!(s.selected_preset_key(), "dnd");
    }

    #[test]
    fn unknown_preset_is_rejected() {
        let mut s = settings();
        s.set_selected_preset_key("vtm").expect("known preset");
        assert!(s.set_selected_preset_key("gurps").is_err());
        assert_eq!(s.selected_preset_key(), "vtm");
    }

    #[test]
    fn stats_for_fills_defaults_lazily() {
        let mut s = settings();
        let dnd = s.active_preset();
        assert!(s.store().get("stats_Alice").is_none());

        let stats = s.stats_for("Alice", dnd);
        assert_eq!(stats.len(), 6);
        assert_eq!(stats.get("Charisma"), Some(&10));
        assert_eq!(s.store().get("stats_Alice").and_then(|v| v.get("Wisdom").cloned()), Some(json!(10)));
    }

    #[test]
    fn stats_for_clamps_stored_values() {
        let mut s = ExtensionSettings::new(MemorySettings::from_json(json!({
            "stats_Alice": {"Strength": 75, "Dexterity": 12.4}
        })));
        let dnd = s.active_preset();
        let stats = s.stats_for("Alice", dnd);
        assert_eq!(stats.get("Strength"), Some(&20));
        assert_eq!(stats.get("Dexterity"), Some(&12));
    }

    #[test]
    fn set_stat_clamps_and_persists() {
        let mut s = settings();
        let dnd = s.active_preset();
        assert_eq!(s.set_stat("Alice", "Strength", 42, dnd), 20);
        assert_eq!(s.stats_for("Alice", dnd).get("Strength"), Some(&20));
    }

    #[test]
    fn switching_presets_keeps_old_stats() {
        let mut s = settings();
        let dnd = s.active_preset();
        s.set_stat("Alice", "Wisdom", 17, dnd);

        let special = s.set_selected_preset_key("special").expect("known preset");
        let stats = s.stats_for("Alice", special);
        assert!(stats.contains_key("Luck"));
        assert!(!stats.contains_key("Wisdom"));

        let dnd = s.set_selected_preset_key("dnd").expect("known preset");
        assert_eq!(s.stats_for("Alice", dnd).get("Wisdom"), Some(&17));
    }

    #[test]
    fn panel_collapsed_round_trips() {
        let mut s = settings();
        assert!(!s.panel_collapsed());
        s.set_panel_collapsed(true);
        assert!(s.panel_collapsed());
    }

    #[test]
    fn stored_stats_skips_garbage() {
        let s = ExtensionSettings::new(MemorySettings::from_json(json!({
            "stats_Bob": {"Strength": 9, "Mood": "grumpy"}
        })));
        let stats = s.stored_stats("Bob");
        assert_eq!(stats.len(), 1);
        assert_eq!(stats.get("Strength"), Some(&9));
    }

    #[test]
    fn save_reaches_the_store() {
        let mut store = MemorySettings::new();
        store.save().expect("memory save");
        assert_eq!(store.save_count(), 1);
    }
}
