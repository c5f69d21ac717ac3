//! The combined evaluation prompt.
//!
//! One prompt covers every participant. Its layout keeps the static part first
//! so model servers can reuse a cached prefix across calls:
//!
//! ```text
//! [static instructions]   depends only on the preset
//! [recent conversation]   optional grounding transcript
//! [mode instruction]      fresh vs. incremental
//! [characters]            names, plus current stats when incremental
//! ```

use charsheet_core::preset::Preset;
use charsheet_core::types::{ChatMessage, StatSet};

/// Instructions shared by every evaluation under one preset.
pub const EVAL_STATIC_PREFIX: &str = r#"You are a character stat evaluator for a {prompt_label} roleplay.

Your job: evaluate stats and assign a fitting title for each character listed below.
Stats to evaluate: {stat_names}
Valid range for each stat: {min} to {max}

Rules:
- Consider each character's actions, injuries, emotional state, buffs/debuffs, personality, and role in the story.
- Titles should be evocative and fitting, in the format "Name, the Title" (e.g. "Yuriko, the Tiger's Shadow").
- Respond with ONLY a JSON object. Each key is the character's exact name. Each value has "title" (string) and "stats" (object with full stat names as keys, integer values).
- Example value: {example_value}"#;

/// Mode instruction for a brand new conversation.
pub const FRESH_INSTRUCTION: &str = "This is a brand new conversation. Evaluate all characters from scratch based on their descriptions and the opening scenario. Do NOT use default or sample values.";

/// Mode instruction for an ongoing conversation.
pub const UPDATE_INSTRUCTION: &str =
    "Based on everything that has happened in this conversation so far, update the stats accordingly.";

/// Simple template interpolation for prompts.
///
/// Replaces `{key}` with the corresponding value.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

/// Whether the model should start from scratch or update existing stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    /// Ignore prior stats; evaluate from descriptions and the opening.
    Fresh,
    /// Anchor on the current stats and update them.
    Incremental,
}

impl EvalMode {
    /// `true` → [`EvalMode::Fresh`].
    #[must_use]
    pub fn from_fresh(fresh: bool) -> Self {
        if fresh { Self::Fresh } else { Self::Incremental }
    }

    /// Whether this is a fresh evaluation.
    #[must_use]
    pub fn is_fresh(self) -> bool {
        matches!(self, Self::Fresh)
    }
}

/// One participant as the prompt sees it.
#[derive(Debug, Clone)]
pub struct PromptCharacter {
    /// Exact participant name, also the expected reply key.
    pub name: String,
    /// Whether this is the player.
    pub is_user: bool,
    /// Current stat values (only rendered in incremental mode).
    pub current_stats: StatSet,
}

/// Example reply value in preset order, compact JSON.
#[must_use]
pub fn example_value(preset: &Preset) -> String {
    let stats = preset
        .stats
        .iter()
        .map(|s| format!("\"{}\":{}", s.name, s.default))
        .collect::<Vec<_>>()
        .join(",");
    format!("{{\"title\":\"Name, the Evocative Title\",\"stats\":{{{stats}}}}}")
}

/// The cacheable instruction block for `preset`.
#[must_use]
pub fn static_prefix(preset: &Preset) -> String {
    let stat_names = preset.stat_names().collect::<Vec<_>>().join(", ");
    let min = preset.min.to_string();
    let max = preset.max.to_string();
    let example = example_value(preset);
    render_template(
        EVAL_STATIC_PREFIX,
        &[
            ("prompt_label", preset.prompt_label),
            ("stat_names", &stat_names),
            ("min", &min),
            ("max", &max),
            ("example_value", &example),
        ],
    )
}

/// Render the trailing `limit` non-blank messages as `Name: text` lines.
#[must_use]
pub fn format_transcript(messages: &[ChatMessage], limit: usize) -> String {
    let mut lines: Vec<String> = messages
        .iter()
        .rev()
        .filter(|m| !m.text.trim().is_empty())
        .take(limit)
        .map(|m| format!("{}: {}", m.name, m.text.trim()))
        .collect();
    lines.reverse();
    lines.join("\n")
}

fn describe(character: &PromptCharacter, preset: &Preset, mode: EvalMode) -> String {
    let who = if character.is_user {
        format!("\"{}\" (the player/user, the protagonist)", character.name)
    } else {
        format!("\"{}\"", character.name)
    };
    if mode.is_fresh() {
        return format!("- {who}");
    }
    let stats = preset
        .stats
        .iter()
        .map(|s| {
            let value = character.current_stats.get(s.name).copied().unwrap_or(s.default);
            format!("{}={value}", s.name)
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("- {who}: {stats}")
}

/// Build the single prompt that evaluates stats and titles for everyone.
///
/// `transcript` is appended as grounding context when present and non-empty.
#[must_use]
pub fn build_combined_eval_prompt(
    characters: &[PromptCharacter],
    preset: &Preset,
    mode: EvalMode,
    transcript: Option<&str>,
) -> String {
    let mut prompt = static_prefix(preset);

    if let Some(transcript) = transcript.filter(|t| !t.trim().is_empty()) {
        prompt.push_str("\n\nRecent conversation:\n");
        prompt.push_str(transcript);
    }

    prompt.push_str("\n\n");
    prompt.push_str(if mode.is_fresh() {
        FRESH_INSTRUCTION
    } else {
        UPDATE_INSTRUCTION
    });

    prompt.push_str("\n\nCharacters:\n");
    let lines = characters
        .iter()
        .map(|c| describe(c, preset, mode))
        .collect::<Vec<_>>()
        .join("\n");
    prompt.push_str(&lines);
    prompt
}
