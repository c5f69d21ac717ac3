//! The evaluation cycle.
//!
//! One model call per cycle covers every participant:
//!
//! ```text
//! snapshot stats ──► combined prompt ──► ModelService::generate
//!                                              │
//!   save + notify ◄── merge ◄── parse_reply ◄──┘
//! ```
//!
//! Only one cycle runs at a time. A call that finds another cycle in flight
//! is dropped, never queued. A cycle whose reply holds no usable JSON object
//! changes nothing.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use charsheet_core::SheetError;
use charsheet_core::metrics::EvalCounters;
use charsheet_core::preset::Preset;
use charsheet_core::types::{Participant, StatDelta, StatSet};
use charsheet_llm::extract::parse_reply;
use charsheet_llm::prompt::{EvalMode, PromptCharacter, build_combined_eval_prompt, format_transcript};
use charsheet_llm::{CharacterVerdict, EvaluationReply, LlmError, LlmRequest};
use tracing::{debug, info, warn};

use crate::session::SheetSession;

/// What a call to the evaluation cycle ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalOutcome {
    /// Evaluation is switched off in settings.
    Disabled,
    /// There was nobody to evaluate.
    EmptyRoster,
    /// Another cycle was in flight; this call was dropped.
    AlreadyRunning,
    /// The model call failed.
    ModelFailed,
    /// The reply contained no balanced JSON object.
    NoJsonObject,
    /// The reply's JSON candidates did not parse.
    InvalidJson,
    /// The reply was merged.
    Applied {
        /// Participants that received a title or stats.
        participants: usize,
        /// Individual stat values written.
        stats_written: usize,
    },
}

impl EvalOutcome {
    /// Whether the cycle changed stored state.
    #[must_use]
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

impl fmt::Display for EvalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("evaluation disabled"),
            Self::EmptyRoster => f.write_str("roster is empty"),
            Self::AlreadyRunning => f.write_str("another evaluation is in flight"),
            Self::ModelFailed => f.write_str("model call failed"),
            Self::NoJsonObject => f.write_str("reply had no JSON object"),
            Self::InvalidJson => f.write_str("reply JSON did not parse"),
            Self::Applied {
                participants,
                stats_written,
            } => write!(f, "updated {participants} participant(s), {stats_written} stat(s)"),
        }
    }
}

/// Holds the in-flight flag and clears it when dropped.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Result of merging one reply.
#[derive(Debug, Default)]
struct MergeReport {
    participants: usize,
    stats_written: usize,
    titles: Vec<(String, String)>,
    deltas: Vec<(String, Vec<StatDelta>)>,
}

impl SheetSession {
    /// Run one evaluation cycle over every participant.
    ///
    /// `fresh` asks the model to ignore prior stats, as at the start of a new
    /// conversation. Failures are logged and reported through the outcome;
    /// nothing is returned as an error.
    pub async fn evaluate_all_characters(&self, fresh: bool) -> EvalOutcome {
        self.evaluate(EvalMode::from_fresh(fresh)).await
    }

    /// [`evaluate_all_characters`](Self::evaluate_all_characters) with an
    /// explicit mode.
    pub async fn evaluate(&self, mode: EvalMode) -> EvalOutcome {
        if !self.is_enabled() {
            EvalCounters::bump(&self.counters.skipped_idle);
            debug!("Evaluation disabled, skipping");
            return EvalOutcome::Disabled;
        }
        let participants = self.roster();
        if participants.is_empty() {
            EvalCounters::bump(&self.counters.skipped_idle);
            debug!("Roster empty, skipping evaluation");
            return EvalOutcome::EmptyRoster;
        }
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            EvalCounters::bump(&self.counters.skipped_in_flight);
            info!("Evaluation already in flight, dropping request");
            return EvalOutcome::AlreadyRunning;
        };
        EvalCounters::bump(&self.counters.cycles_started);

        let (preset, characters) = self.snapshot_participants(&participants);
        let transcript = self.eval_config.include_transcript.then(|| {
            let chat = self.provider.snapshot();
            format_transcript(&chat.messages, self.eval_config.transcript_messages)
        });
        let prompt = build_combined_eval_prompt(&characters, preset, mode, transcript.as_deref());
        let request = LlmRequest::quiet(prompt)
            .with_max_tokens(self.llm_config.max_tokens)
            .with_temperature(self.llm_config.temperature)
            .with_timeout(self.llm_config.timeout_ms);

        info!(
            participants = participants.len(),
            preset = preset.key,
            fresh = mode.is_fresh(),
            "Evaluating characters"
        );

        let response = match self.model.generate(&request).await {
            Ok(response) => response,
            Err(e) => {
                EvalCounters::bump(&self.counters.model_failures);
                warn!(error = %e, "Character evaluation failed");
                return EvalOutcome::ModelFailed;
            }
        };
        debug!(
            latency_ms = response.latency_ms,
            tokens = response.tokens_generated,
            "Model replied"
        );

        let reply = match parse_reply(&response.text) {
            Ok(reply) => reply,
            Err(e) => {
                EvalCounters::bump(&self.counters.parse_failures);
                warn!(error = %e, reply_chars = response.text.len(), "Could not parse evaluation reply");
                return match e {
                    LlmError::NoJsonObject => EvalOutcome::NoJsonObject,
                    _ => EvalOutcome::InvalidJson,
                };
            }
        };

        let report = self.merge_reply(&participants, preset, &reply);
        if let Err(e) = self.settings.lock().save() {
            warn!(error = %e, "Failed to save evaluated stats");
        }
        EvalCounters::add(&self.counters.participants_updated, report.participants as u64);
        EvalCounters::add(&self.counters.stats_written, report.stats_written as u64);

        self.notify(&report);

        info!(
            participants = report.participants,
            stats_written = report.stats_written,
            "Evaluation applied"
        );
        EvalOutcome::Applied {
            participants: report.participants,
            stats_written: report.stats_written,
        }
    }

    /// Re-run an incremental evaluation on demand.
    pub async fn regenerate(&self) -> EvalOutcome {
        self.evaluate(EvalMode::Incremental).await
    }

    /// Select another preset, then re-evaluate everyone under it.
    ///
    /// # Errors
    /// [`SheetError::UnknownPreset`] for keys outside the catalog; nothing is
    /// evaluated in that case.
    pub async fn change_preset(&self, key: &str) -> Result<EvalOutcome, SheetError> {
        self.set_preset(key)?;
        Ok(self.evaluate(EvalMode::Incremental).await)
    }

    /// Record every participant's current stats and build the prompt input.
    fn snapshot_participants(
        &self,
        participants: &[Participant],
    ) -> (&'static Preset, Vec<PromptCharacter>) {
        let mut settings = self.settings.lock();
        let preset = settings.active_preset();
        let mut previous = self.previous.lock();
        previous.clear();

        let characters = participants
            .iter()
            .map(|p| {
                let stats = settings.stats_for(&p.name, preset);
                previous.insert(p.name.clone(), stats.clone());
                PromptCharacter {
                    name: p.name.clone(),
                    is_user: p.is_user,
                    current_stats: stats,
                }
            })
            .collect();
        (preset, characters)
    }

    /// Apply a parsed reply to settings and the roster.
    fn merge_reply(
        &self,
        participants: &[Participant],
        preset: &Preset,
        reply: &EvaluationReply,
    ) -> MergeReport {
        let mut report = MergeReport::default();
        {
            let mut settings = self.settings.lock();
            let previous = self.previous.lock();

            for participant in participants {
                let name = participant.name.as_str();
                let Some(verdict) = reply.verdict(name) else {
                    continue;
                };
                let Some(verdict) = verdict else {
                    warn!(participant = name, "Evaluation entry is not an object, skipping");
                    continue;
                };

                let CharacterVerdict { title, stats } = verdict;
                let mut touched = false;
                if let Some(title) = title {
                    report.titles.push((participant.name.clone(), title));
                    touched = true;
                }
                if let Some(stats) = stats {
                    for def in preset.stats {
                        if let Some(&raw) = stats.get(def.name) {
                            settings.write_stat(name, def.name, preset.clamp_raw(raw));
                            report.stats_written += 1;
                        }
                    }
                    touched = true;
                }
                if !touched {
                    continue;
                }
                report.participants += 1;

                let after = settings.stats_for(name, preset);
                let before = previous.get(name);
                report
                    .deltas
                    .push((participant.name.clone(), stat_deltas(preset, before, &after)));
            }
        }

        if !report.titles.is_empty() {
            let mut roster = self.roster.lock();
            for (name, title) in &report.titles {
                if !roster.set_title(name, title.clone()) {
                    debug!(participant = %name, "Participant left the roster before its title arrived");
                }
            }
        }
        report
    }

    fn notify(&self, report: &MergeReport) {
        let Some(presenter) = &self.presenter else {
            return;
        };
        for (name, title) in &report.titles {
            presenter.title_changed(name, title);
        }
        for (name, deltas) in &report.deltas {
            presenter.stats_changed(name, deltas);
        }
        if let Some(view) = self.panel_view() {
            let view = match report.deltas.iter().find(|(name, _)| *name == view.name) {
                Some((_, deltas)) => view.with_deltas(deltas),
                None => view,
            };
            presenter.refresh(&view);
        }
    }
}

/// Per-stat change for every stat of `preset`. Missing values count as the
/// preset default.
fn stat_deltas(preset: &Preset, before: Option<&StatSet>, after: &StatSet) -> Vec<StatDelta> {
    preset
        .stats
        .iter()
        .map(|def| StatDelta {
            stat: def.name.to_string(),
            old: before.and_then(|s| s.get(def.name).copied()).unwrap_or(def.default),
            new: after.get(def.name).copied().unwrap_or(def.default),
        })
        .collect()
}
