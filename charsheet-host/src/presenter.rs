//! Presentation hooks and the panel view-model.
//!
//! The session never draws anything. It hands a [`PanelView`] to whatever
//! [`Presenter`] the host registered, and tells it about titles and stat
//! deltas after an evaluation. Widgets, markup and event wiring stay on the
//! host side.

use std::fmt;

use charsheet_core::preset::Preset;
use charsheet_core::types::{Participant, StatDelta, StatSet, StatValue};
use serde::Serialize;

/// Avatar shown for participants without one.
pub const DEFAULT_AVATAR: &str = "/img/ai4.png";

/// Consumer of roster and stat updates.
pub trait Presenter: Send + Sync {
    /// Redraw the panel for the participant being viewed.
    fn refresh(&self, view: &PanelView);

    /// An evaluation changed (or confirmed) the stats of `name`.
    fn stats_changed(&self, name: &str, deltas: &[StatDelta]);

    /// An evaluation gave `name` a new title.
    fn title_changed(&self, _name: &str, _title: &str) {}
}

/// One stat line of the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatRow {
    /// Stat name.
    pub stat: String,
    /// Current value.
    pub value: StatValue,
    /// Preset lower bound.
    pub min: StatValue,
    /// Preset upper bound.
    pub max: StatValue,
    /// Bar fill, 0–100.
    pub percent: u8,
    /// Bar colour, `rgb(r,g,0)`.
    pub color: String,
    /// Change from the last evaluation, when one was just applied.
    pub delta: Option<i64>,
}

/// Everything needed to draw the panel for one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelView {
    /// Participant name.
    pub name: String,
    /// Title shown instead of the name.
    pub title: String,
    /// Avatar resource, falling back to [`DEFAULT_AVATAR`].
    pub avatar: String,
    /// Whether this is the player.
    pub is_user: bool,
    /// One row per preset stat, in preset order.
    pub rows: Vec<StatRow>,
    /// Zero-based roster position.
    pub position: usize,
    /// Roster length.
    pub total: usize,
    /// Whether the panel is collapsed.
    pub collapsed: bool,
    /// Active preset key.
    pub preset_key: String,
    /// Active preset display name.
    pub preset_name: String,
}

impl PanelView {
    /// Build the view for `entry` at `position` of a roster of `total`.
    #[must_use]
    pub fn build(
        entry: &Participant,
        stats: &StatSet,
        preset: &Preset,
        position: usize,
        total: usize,
        collapsed: bool,
    ) -> Self {
        let rows = preset
            .stats
            .iter()
            .map(|def| {
                let value = stats.get(def.name).copied().unwrap_or(def.default);
                StatRow {
                    stat: def.name.to_string(),
                    value,
                    min: preset.min,
                    max: preset.max,
                    percent: bar_percent(value, preset.min, preset.max),
                    color: stat_color(value, preset.min, preset.max),
                    delta: None,
                }
            })
            .collect();

        Self {
            name: entry.name.clone(),
            title: entry.display_title().to_string(),
            avatar: entry
                .avatar
                .clone()
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| DEFAULT_AVATAR.to_string()),
            is_user: entry.is_user,
            rows,
            position,
            total,
            collapsed,
            preset_key: preset.key.to_string(),
            preset_name: preset.name.to_string(),
        }
    }

    /// Attach deltas to the matching rows. Zero changes stay unmarked.
    #[must_use]
    pub fn with_deltas(mut self, deltas: &[StatDelta]) -> Self {
        for row in &mut self.rows {
            row.delta = deltas
                .iter()
                .find(|d| d.stat == row.stat)
                .map(StatDelta::diff)
                .filter(|d| *d != 0);
        }
        self
    }

    /// Navigation counter, one-based: `"2/3"`.
    #[must_use]
    pub fn counter(&self) -> String {
        format!("{}/{}", self.position + 1, self.total)
    }
}

impl fmt::Display for PanelView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}] ({})", self.title, self.counter(), self.preset_name)?;
        for row in &self.rows {
            write!(f, "  {:<14} {:>4}  [{}..{}]", row.stat, row.value, row.min, row.max)?;
            match row.delta {
                Some(d) if d > 0 => writeln!(f, "  (+{d})")?,
                Some(d) => writeln!(f, "  ({d})")?,
                None => writeln!(f)?,
            }
        }
        Ok(())
    }
}

fn position_in_range(value: StatValue, min: StatValue, max: StatValue) -> f64 {
    if max <= min {
        return 1.0;
    }
    (f64::from(value) - f64::from(min)) / (f64::from(max) - f64::from(min))
}

/// Red-to-green colour for a value in `[min, max]`.
#[must_use]
pub fn stat_color(value: StatValue, min: StatValue, max: StatValue) -> String {
    let t = position_in_range(value, min, max).clamp(0.0, 1.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (r, g) = ((255.0 * (1.0 - t)).round() as u8, (255.0 * t).round() as u8);
    format!("rgb({r},{g},0)")
}

/// Bar fill percentage for a value in `[min, max]`.
#[must_use]
pub fn bar_percent(value: StatValue, min: StatValue, max: StatValue) -> u8 {
    let t = position_in_range(value, min, max).clamp(0.0, 1.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pct = (t * 100.0).round() as u8;
    pct
}

#[cfg(test)]
mod tests {
    use super::*;
    use charsheet_core::preset;

    #[test]
    fn colour_runs_red_to_green() {
        assert_eq!(stat_color(1, 1, 20), "rgb(255,0,0)");
        assert_eq!(stat_color(20, 1, 20), "rgb(0,255,0)");
        assert_eq!(stat_color(50, 0, 100), "rgb(128,128,0)");
    }

    #[test]
    fn percent_is_bounded() {
        assert_eq!(bar_percent(0, 0, 5), 0);
        assert_eq!(bar_percent(5, 0, 5), 100);
        assert_eq!(bar_percent(99, 0, 5), 100);
        assert_eq!(bar_percent(3, 3, 3), 100);
    }

    #[test]
    fn view_uses_defaults_and_fallback_avatar() {
        let dnd = preset::default_preset();
        let mut stats = StatSet::new();
        stats.insert("Strength".into(), 20);
        let entry = Participant::user("Kai");

        let view = PanelView::build(&entry, &stats, dnd, 2, 3, false);
        assert_eq!(view.avatar, DEFAULT_AVATAR);
        assert_eq!(view.counter(), "3/3");
        assert_eq!(view.rows.len(), 6);
        assert_eq!(view.rows[0].value, 20);
        assert_eq!(view.rows[0].percent, 100);
        assert_eq!(view.rows[1].value, 10);
        assert!(view.is_user);
    }

    #[test]
    fn deltas_mark_changed_rows_only() {
        let dnd = preset::default_preset();
        let entry = Participant::character("Alice", Some("/characters/alice.png".into()));
        let deltas = vec![
            StatDelta { stat: "Strength".into(), old: 10, new: 15 },
            StatDelta { stat: "Dexterity".into(), old: 10, new: 10 },
            StatDelta { stat: "Wisdom".into(), old: 12, new: 9 },
        ];
        let view = PanelView::build(&entry, &StatSet::new(), dnd, 0, 1, true).with_deltas(&deltas);
        assert_eq!(view.rows[0].delta, Some(5));
        assert_eq!(view.rows[1].delta, None);
        assert_eq!(view.rows[4].delta, Some(-3));
        assert_eq!(view.avatar, "/characters/alice.png");

        let text = view.to_string();
        assert!(text.contains("(+5)"));
        assert!(text.contains("(-3)"));
    }
}
