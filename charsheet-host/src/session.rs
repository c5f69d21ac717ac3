//! The session context: one object owning all per-session state.
//!
//! Roster, pre-evaluation snapshots and the in-flight flag live here instead
//! of in process-wide globals. Every lock is a short `parking_lot::Mutex`
//! critical section and none is held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use charsheet_core::config::{EvaluationConfig, LlmConfig};
use charsheet_core::metrics::{CounterSnapshot, EvalCounters};
use charsheet_core::preset::Preset;
use charsheet_core::roster::Roster;
use charsheet_core::settings::ExtensionSettings;
use charsheet_core::types::{Participant, StatSet, StatValue};
use charsheet_core::SheetError;
use charsheet_llm::ModelService;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::presenter::{PanelView, Presenter};
use crate::provider::SessionProvider;

/// Per-session state and the ports it talks to.
pub struct SheetSession {
    pub(crate) provider: Arc<dyn SessionProvider>,
    pub(crate) model: Arc<dyn ModelService>,
    pub(crate) settings: Mutex<ExtensionSettings>,
    pub(crate) roster: Mutex<Roster>,
    pub(crate) previous: Mutex<HashMap<String, StatSet>>,
    pub(crate) in_flight: AtomicBool,
    pub(crate) presenter: Option<Arc<dyn Presenter>>,
    pub(crate) eval_config: EvaluationConfig,
    pub(crate) llm_config: LlmConfig,
    pub(crate) counters: EvalCounters,
}

impl std::fmt::Debug for SheetSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetSession")
            .field("participants", &self.roster.lock().len())
            .field("in_flight", &self.is_evaluating())
            .field("has_presenter", &self.presenter.is_some())
            .finish_non_exhaustive()
    }
}

impl SheetSession {
    /// A session over the given host ports with default configuration.
    pub fn new(
        provider: Arc<dyn SessionProvider>,
        model: Arc<dyn ModelService>,
        settings: ExtensionSettings,
    ) -> Self {
        Self {
            provider,
            model,
            settings: Mutex::new(settings),
            roster: Mutex::new(Roster::new()),
            previous: Mutex::new(HashMap::new()),
            in_flight: AtomicBool::new(false),
            presenter: None,
            eval_config: EvaluationConfig::default(),
            llm_config: LlmConfig::default(),
            counters: EvalCounters::new(),
        }
    }

    /// Register the presentation surface.
    #[must_use]
    pub fn with_presenter(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    /// Override the `[evaluation]` settings.
    #[must_use]
    pub fn with_evaluation_config(mut self, config: EvaluationConfig) -> Self {
        self.eval_config = config;
        self
    }

    /// Override the `[llm]` sampling settings.
    #[must_use]
    pub fn with_llm_config(mut self, config: LlmConfig) -> Self {
        self.llm_config = config;
        self
    }

    /// The `[evaluation]` settings in effect.
    #[must_use]
    pub fn evaluation_config(&self) -> &EvaluationConfig {
        &self.eval_config
    }

    // -----------------------------------------------------------------------
    // Roster
    // -----------------------------------------------------------------------

    /// Rebuild the roster from the host's chat. Returns the message count.
    pub fn rebuild_roster(&self) -> usize {
        let snapshot = self.provider.snapshot();
        self.roster.lock().rebuild(&snapshot);
        snapshot.messages.len()
    }

    /// Build a fresh roster for a different conversation. Returns the message
    /// count.
    pub fn reset_roster(&self) -> usize {
        let snapshot = self.provider.snapshot();
        self.roster.lock().reset(&snapshot);
        self.previous.lock().clear();
        snapshot.messages.len()
    }

    /// Copy of the current participants.
    #[must_use]
    pub fn roster(&self) -> Vec<Participant> {
        self.roster.lock().entries().to_vec()
    }

    /// The participant being viewed.
    #[must_use]
    pub fn current_entry(&self) -> Option<Participant> {
        self.roster.lock().current().cloned()
    }

    /// Index of the participant being viewed.
    #[must_use]
    pub fn view_index(&self) -> usize {
        self.roster.lock().view_index()
    }

    /// View the next participant, wrapping around, and redraw.
    pub fn navigate_next(&self) -> Option<Participant> {
        let entry = self.roster.lock().navigate_next().cloned();
        self.refresh_presenter();
        entry
    }

    /// View the previous participant, wrapping around, and redraw.
    pub fn navigate_prev(&self) -> Option<Participant> {
        let entry = self.roster.lock().navigate_prev().cloned();
        self.refresh_presenter();
        entry
    }

    /// View the participant at `index`. Out-of-range indices are ignored.
    pub fn set_view_index(&self, index: usize) -> bool {
        let moved = self.roster.lock().set_view_index(index);
        if moved {
            self.refresh_presenter();
        }
        moved
    }

    /// View the first participant again.
    pub fn reset_view(&self) {
        self.roster.lock().reset_view();
    }

    // -----------------------------------------------------------------------
    // Stats
    // -----------------------------------------------------------------------

    /// The preset selected in settings.
    #[must_use]
    pub fn active_preset(&self) -> &'static Preset {
        self.settings.lock().active_preset()
    }

    /// Stats of `name` under the active preset, filling in defaults.
    pub fn get_stats_for_name(&self, name: &str) -> StatSet {
        let mut settings = self.settings.lock();
        let preset = settings.active_preset();
        settings.stats_for(name, preset)
    }

    /// Stats of `name` as they were right before the last evaluation.
    #[must_use]
    pub fn previous_stats(&self, name: &str) -> StatSet {
        self.previous.lock().get(name).cloned().unwrap_or_default()
    }

    /// Apply a user edit from the panel.
    ///
    /// `raw` is parsed as an integer (anything unparsable counts as 0), clamped
    /// into the active preset's range, stored and saved. Returns the stored
    /// value.
    pub fn on_stat_change(&self, name: &str, stat: &str, raw: &str) -> StatValue {
        let value = parse_leading_int(raw);
        let mut settings = self.settings.lock();
        let preset = settings.active_preset();
        let stored = settings.set_stat(name, stat, value, preset);
        if let Err(e) = settings.save() {
            warn!(error = %e, "Failed to save settings after stat edit");
        }
        debug!(participant = name, stat, value = stored, "Stat edited");
        stored
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    /// Whether evaluation is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.settings.lock().is_enabled()
    }

    /// Turn evaluation on or off and save.
    pub fn set_enabled(&self, enabled: bool) {
        let mut settings = self.settings.lock();
        settings.set_enabled(enabled);
        if let Err(e) = settings.save() {
            warn!(error = %e, "Failed to save settings");
        }
        info!(enabled, "Evaluation toggled");
    }

    /// Select another preset, save and redraw. Stored stats of other presets
    /// are untouched.
    ///
    /// # Errors
    /// [`SheetError::UnknownPreset`] for keys outside the catalog.
    pub fn set_preset(&self, key: &str) -> Result<&'static Preset, SheetError> {
        let preset = {
            let mut settings = self.settings.lock();
            let preset = settings.set_selected_preset_key(key)?;
            settings.save()?;
            preset
        };
        info!(preset = preset.key, "Preset changed");
        self.refresh_presenter();
        Ok(preset)
    }

    /// Flip the panel collapsed flag and save. Returns the new state.
    pub fn toggle_panel_collapsed(&self) -> bool {
        let mut settings = self.settings.lock();
        let collapsed = !settings.panel_collapsed();
        settings.set_panel_collapsed(collapsed);
        if let Err(e) = settings.save() {
            warn!(error = %e, "Failed to save settings");
        }
        collapsed
    }

    /// Flush settings, including defaults filled in by reads.
    ///
    /// # Errors
    /// Propagates the settings store's save error.
    pub fn save(&self) -> Result<(), SheetError> {
        self.settings.lock().save()
    }

    /// Whether an evaluation is running.
    #[must_use]
    pub fn is_evaluating(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Evaluation counters so far.
    #[must_use]
    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    // -----------------------------------------------------------------------
    // Presentation
    // -----------------------------------------------------------------------

    /// View-model of the participant being viewed.
    pub fn panel_view(&self) -> Option<PanelView> {
        let (entry, position, total) = {
            let roster = self.roster.lock();
            (roster.current()?.clone(), roster.view_index(), roster.len())
        };
        let mut settings = self.settings.lock();
        let preset = settings.active_preset();
        let stats = settings.stats_for(&entry.name, preset);
        let collapsed = settings.panel_collapsed();
        Some(PanelView::build(&entry, &stats, preset, position, total, collapsed))
    }

    /// Hand the current view to the presenter, if one is registered.
    pub fn refresh_presenter(&self) {
        let Some(presenter) = &self.presenter else {
            return;
        };
        if let Some(view) = self.panel_view() {
            presenter.refresh(&view);
        }
    }
}

/// `parseInt`-style parse: optional sign and leading digits, 0 otherwise.
fn parse_leading_int(raw: &str) -> StatValue {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let run = &digits[..end];
    if run.is_empty() {
        return 0;
    }
    let saturated = if sign < 0 { StatValue::MIN } else { StatValue::MAX };
    run.parse::<i64>()
        .ok()
        .and_then(|n| StatValue::try_from(sign * n).ok())
        .unwrap_or(saturated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_int_parse() {
        assert_eq!(parse_leading_int("14"), 14);
        assert_eq!(parse_leading_int("  7abc"), 7);
        assert_eq!(parse_leading_int("-3"), -3);
        assert_eq!(parse_leading_int("12.9"), 12);
        assert_eq!(parse_leading_int("abc"), 0);
        assert_eq!(parse_leading_int(""), 0);
        assert_eq!(parse_leading_int("99999999999999"), StatValue::MAX);
        assert_eq!(parse_leading_int("99999999999999999999"), StatValue::MAX);
        assert_eq!(parse_leading_int("-99999999999999999999"), StatValue::MIN);
        assert_eq!(parse_leading_int("-"), 0);
    }
}
