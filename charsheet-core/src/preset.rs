//! Stat presets — the fixed catalog of stat schemas.
//!
//! A preset decides which stats exist, their default values and the inclusive
//! range every stored value must respect. Exactly one preset is active per
//! session, chosen by the persisted `_presetKey`.

use serde::Serialize;

use crate::error::{Result, SheetError};
use crate::types::{StatSet, StatValue};

/// Preset used when nothing (or something unknown) is selected.
pub const DEFAULT_PRESET_KEY: &str = "dnd";

/// One stat of a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatDef {
    /// Full stat name; this is also the key the model must answer with.
    pub name: &'static str,
    /// Value assumed before anything was evaluated.
    pub default: StatValue,
}

/// An immutable stat schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Preset {
    /// Catalog key (persisted as `_presetKey`).
    pub key: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Ordered stats.
    pub stats: &'static [StatDef],
    /// Inclusive lower bound.
    pub min: StatValue,
    /// Inclusive upper bound.
    pub max: StatValue,
    /// How the game system is named inside prompts.
    pub prompt_label: &'static str,
}

const fn stat(name: &'static str, default: StatValue) -> StatDef {
    StatDef { name, default }
}

/// The full catalog, in selector order.
pub static PRESETS: &[Preset] = &[
    Preset {
        key: "dnd",
        name: "D&D",
        stats: &[
            stat("Strength", 10),
            stat("Dexterity", 10),
            stat("Constitution", 10),
            stat("Intelligence", 10),
            stat("Wisdom", 10),
            stat("Charisma", 10),
        ],
        min: 1,
        max: 20,
        prompt_label: "D&D",
    },
    Preset {
        key: "special",
        name: "Fallout (SPECIAL)",
        stats: &[
            stat("Strength", 5),
            stat("Perception", 5),
            stat("Endurance", 5),
            stat("Charisma", 5),
            stat("Intelligence", 5),
            stat("Agility", 5),
            stat("Luck", 5),
        ],
        min: 1,
        max: 10,
        prompt_label: "Fallout SPECIAL",
    },
    Preset {
        key: "elderScrolls",
        name: "Elder Scrolls",
        stats: &[
            stat("Strength", 50),
            stat("Intelligence", 50),
            stat("Willpower", 50),
            stat("Agility", 50),
            stat("Speed", 50),
            stat("Endurance", 50),
            stat("Personality", 50),
            stat("Luck", 50),
        ],
        min: 0,
        max: 100,
        prompt_label: "Elder Scrolls",
    },
    Preset {
        key: "cyberpunk",
        name: "Cyberpunk",
        stats: &[
            stat("Intelligence", 5),
            stat("Reflexes", 5),
            stat("Dexterity", 5),
            stat("Technology", 5),
            stat("Cool", 5),
            stat("Willpower", 5),
            stat("Luck", 5),
            stat("Movement", 5),
            stat("Body", 5),
            stat("Empathy", 5),
        ],
        min: 1,
        max: 10,
        prompt_label: "Cyberpunk",
    },
    Preset {
        key: "callOfCthulhu",
        name: "Call of Cthulhu",
        stats: &[
            stat("Strength", 50),
            stat("Constitution", 50),
            stat("Size", 50),
            stat("Dexterity", 50),
            stat("Appearance", 50),
            stat("Intelligence", 50),
            stat("Power", 50),
            stat("Education", 50),
            stat("Sanity", 50),
        ],
        min: 0,
        max: 99,
        prompt_label: "Call of Cthulhu",
    },
    Preset {
        key: "vtm",
        name: "Vampire: The Masquerade",
        stats: &[
            stat("Strength", 1),
            stat("Dexterity", 1),
            stat("Stamina", 1),
            stat("Charisma", 1),
            stat("Manipulation", 1),
            stat("Appearance", 1),
            stat("Perception", 1),
            stat("Intelligence", 1),
            stat("Wits", 1),
        ],
        min: 0,
        max: 5,
        prompt_label: "Vampire: The Masquerade",
    },
];

/// Look up a preset by key.
#[must_use]
pub fn preset(key: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.key == key)
}

/// Look up a preset by key, or fail with [`SheetError::UnknownPreset`].
///
/// # Errors
/// Returns an error if the key is not in the catalog.
pub fn require(key: &str) -> Result<&'static Preset> {
    preset(key).ok_or_else(|| SheetError::UnknownPreset(key.to_string()))
}

/// Resolve a possibly-missing key, falling back to [`DEFAULT_PRESET_KEY`].
#[must_use]
pub fn resolve(key: Option<&str>) -> &'static Preset {
    key.and_then(preset).unwrap_or_else(default_preset)
}

/// The fallback preset.
#[must_use]
pub fn default_preset() -> &'static Preset {
    &PRESETS[0]
}

impl Preset {
    /// Ordered stat names.
    pub fn stat_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.stats.iter().map(|s| s.name)
    }

    /// Default for a stat, if this preset defines it.
    #[must_use]
    pub fn default_for(&self, stat: &str) -> Option<StatValue> {
        self.stats.iter().find(|s| s.name == stat).map(|s| s.default)
    }

    /// Whether this preset defines the stat.
    #[must_use]
    pub fn has_stat(&self, stat: &str) -> bool {
        self.stats.iter().any(|s| s.name == stat)
    }

    /// Clamp an integer into `[min, max]`.
    #[must_use]
    pub fn clamp(&self, value: StatValue) -> StatValue {
        value.clamp(self.min, self.max)
    }

    /// Round and clamp a raw number coming from model output.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn clamp_raw(&self, value: f64) -> StatValue {
        if value.is_nan() {
            return self.min;
        }
        value
            .round()
            .clamp(f64::from(self.min), f64::from(self.max)) as StatValue
    }

    /// Full stat set at default values.
    #[must_use]
    pub fn default_stats(&self) -> StatSet {
        self.stats
            .iter()
            .map(|s| (s.name.to_string(), s.default))
            .collect()
    }

    /// Width of the range, never zero.
    #[must_use]
    pub fn span(&self) -> StatValue {
        (self.max - self.min).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_keys_are_unique() {
        for (i, a) in PRESETS.iter().enumerate() {
            for b in &PRESETS[i + 1..] {
                assert_ne!(a.key, b.key);
            }
        }
    }

    #[test]
    fn defaults_are_within_range() {
        for p in PRESETS {
            assert!(p.min < p.max, "{} has an empty range", p.key);
            for s in p.stats {
                assert!(
                    (p.min..=p.max).contains(&s.default),
                    "{}.{} default out of range",
                    p.key,
                    s.name
                );
            }
        }
    }

    #[test]
    fn stat_counts_match_catalog() {
        let counts: Vec<(&str, usize)> = PRESETS.iter().map(|p| (p.key, p.stats.len())).collect();
        assert_eq!(
            counts,
            vec![
                ("dnd", 6),
                ("special", 7),
                ("elderScrolls", 8),
                ("cyberpunk", 10),
                ("callOfCthulhu", 9),
                ("vtm", 9),
            ]
        );
    }

    #[test]
    fn resolve_falls_back_to_default() {
        assert_eq!(resolve(None).key, DEFAULT_PRESET_KEY);
        assert_eq!(resolve(Some("nope")).key, DEFAULT_PRESET_KEY);
        assert_eq!(resolve(Some("vtm")).key, "vtm");
    }

    #[test]
    fn require_rejects_unknown_keys() {
        assert!(require("special").is_ok());
        assert!(matches!(require("gurps"), Err(SheetError::UnknownPreset(k)) if k == "gurps"));
    }

    #[test]
    fn clamp_respects_bounds() {
        let dnd = default_preset();
        assert_eq!(dnd.clamp(-4), 1);
        assert_eq!(dnd.clamp(25), 20);
        assert_eq!(dnd.clamp(12), 12);
    }

    #[test]
    fn clamp_raw_rounds_model_numbers() {
        let dnd = default_preset();
        assert_eq!(dnd.clamp_raw(14.6), 15);
        assert_eq!(dnd.clamp_raw(1e12), 20);
        assert_eq!(dnd.clamp_raw(-3.2), 1);
    }

    #[test]
    fn default_stats_cover_every_stat() {
        let special = require("special").expect("catalog preset");
        let stats = special.default_stats();
        assert_eq!(stats.len(), 7);
        assert!(stats.values().all(|v| *v == 5));
    }
}
