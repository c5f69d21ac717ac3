//! Property-based tests for roster building and stat clamping.
//!
//! Uses `proptest` to check the roster invariants under arbitrary chat logs:
//! names distinct case-insensitively, the player last and flagged exactly once.

use std::collections::HashSet;

use proptest::prelude::*;

use charsheet_core::preset::{self, PRESETS};
use charsheet_core::roster::{Roster, build_roster};
use charsheet_core::settings::{ExtensionSettings, MemorySettings};
use charsheet_core::types::{CharacterCard, ChatMessage, ChatSnapshot};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

/// Small name pool with case variants so collisions actually happen.
fn arb_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "Alice", "alice", "ALICE", "Bob", "bob", "Kai", "kai", "Mira", "Goran", "", "Seraphina",
    ])
    .prop_map(str::to_string)
}

fn arb_message() -> impl Strategy<Value = ChatMessage> {
    (arb_name(), any::<bool>()).prop_map(|(name, is_user)| ChatMessage {
        name,
        text: "...".into(),
        is_user,
    })
}

fn arb_snapshot() -> impl Strategy<Value = ChatSnapshot> {
    (
        prop::collection::vec(arb_message(), 0..40),
        prop::option::of(arb_name()),
        prop::option::of(arb_name()),
    )
        .prop_map(|(messages, primary, user_name)| ChatSnapshot {
            messages,
            primary: primary.map(CharacterCard::new),
            characters: vec![CharacterCard::new("Alice").with_avatar("alice.png")],
            user_name,
        })
}

// ---------------------------------------------------------------------------
// Property: roster invariants hold for any chat log
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn roster_names_distinct_case_insensitively(snap in arb_snapshot()) {
        let roster = build_roster(&snap);
        let mut seen = HashSet::new();
        for p in &roster {
            prop_assert!(seen.insert(p.name.to_lowercase()), "duplicate {}", p.name);
        }
    }

    #[test]
    fn roster_user_last_and_unique(snap in arb_snapshot()) {
        let roster = build_roster(&snap);
        prop_assert!(!roster.is_empty());
        prop_assert_eq!(roster.iter().filter(|p| p.is_user).count(), 1);
        let last = roster.last().expect("non-empty roster");
        prop_assert!(last.is_user);
        prop_assert_eq!(last.name.as_str(), snap.user_name());
    }

    #[test]
    fn roster_primary_first_when_distinct(snap in arb_snapshot()) {
        let roster = build_roster(&snap);
        if let Some(primary) = &snap.primary {
            if !primary.name.is_empty()
                && primary.name.to_lowercase() != snap.user_name().to_lowercase()
            {
                prop_assert_eq!(&roster[0].name, &primary.name);
            }
        }
    }

    #[test]
    fn roster_has_no_empty_names(snap in arb_snapshot()) {
        prop_assert!(build_roster(&snap).iter().all(|p| !p.name.is_empty()));
    }

    #[test]
    fn navigation_wraps_modulo_len(snap in arb_snapshot(), steps in 0usize..50) {
        let mut roster = Roster::new();
        roster.rebuild(&snap);
        let len = roster.len();
        for _ in 0..steps {
            roster.navigate_next();
        }
        prop_assert_eq!(roster.view_index(), steps % len);
        for _ in 0..steps {
            roster.navigate_prev();
        }
        prop_assert_eq!(roster.view_index(), 0);
    }
}

// ---------------------------------------------------------------------------
// Property: clamping is idempotent and always in range
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn clamp_is_idempotent(value in any::<i32>(), idx in 0..PRESETS.len()) {
        let p = &PRESETS[idx];
        let once = p.clamp(value);
        prop_assert_eq!(p.clamp(once), once);
        prop_assert!(once >= p.min && once <= p.max);
    }

    #[test]
    fn clamp_raw_in_range(value in -1.0e15..1.0e15f64, idx in 0..PRESETS.len()) {
        let p = &PRESETS[idx];
        let v = p.clamp_raw(value);
        prop_assert!(v >= p.min && v <= p.max);
        prop_assert_eq!(p.clamp(v), v);
    }

    #[test]
    fn set_stat_always_stores_in_range(value in any::<i32>()) {
        let mut settings = ExtensionSettings::new(MemorySettings::new());
        let dnd = preset::default_preset();
        let stored = settings.set_stat("Alice", "Strength", value, dnd);
        prop_assert!(stored >= dnd.min && stored <= dnd.max);
        let stats = settings.stats_for("Alice", dnd);
        prop_assert_eq!(stats.get("Strength"), Some(&stored));
    }
}
