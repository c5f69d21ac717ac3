//! `charsheet` — drive a character sheet session from the command line.
//!
//! The chat comes from a JSON snapshot file, stats live in a SQLite settings
//! database, and the model is whatever `[llm]` in `charsheet.toml` points at.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use charsheet_core::persistence::SqliteSettings;
use charsheet_core::preset::PRESETS;
use charsheet_core::roster::build_roster;
use charsheet_core::settings::ExtensionSettings;
use charsheet_core::types::StatDelta;
use charsheet_core::SheetConfig;
use charsheet_host::provider::{SessionProvider, StaticProvider};
use charsheet_host::telemetry::init_tracing;
use charsheet_host::{PanelView, Presenter, SheetSession};
use charsheet_llm::LlmClient;
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "charsheet",
    about = "Per-character stat sheets for chat role-play, evaluated by an LLM",
    version
)]
struct Cli {
    /// Path to charsheet.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Settings database, overriding `[persistence] db_path`
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available presets
    Presets,

    /// Show the participants of a chat
    Roster {
        /// Chat snapshot (JSON)
        #[arg(long)]
        chat: PathBuf,
    },

    /// Show every participant's sheet without evaluating
    Sheet {
        /// Chat snapshot (JSON)
        #[arg(long)]
        chat: PathBuf,
    },

    /// Ask the model to evaluate every participant
    Evaluate {
        /// Chat snapshot (JSON)
        #[arg(long)]
        chat: PathBuf,

        /// Ignore prior stats, as for a brand new conversation
        #[arg(long)]
        fresh: bool,

        /// Switch to this preset first
        #[arg(long)]
        preset: Option<String>,
    },
}

/// Prints every update to stdout.
struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn refresh(&self, view: &PanelView) {
        print!("{view}");
    }

    fn stats_changed(&self, name: &str, deltas: &[StatDelta]) {
        let changed: Vec<String> = deltas
            .iter()
            .filter(|d| d.diff() != 0)
            .map(ToString::to_string)
            .collect();
        if changed.is_empty() {
            println!("{name}: no change");
        } else {
            println!("{name}: {}", changed.join(", "));
        }
    }

    fn title_changed(&self, name: &str, title: &str) {
        println!("{name} is now \"{title}\"");
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<SheetConfig> {
    let mut config = match &cli.config {
        Some(path) => SheetConfig::from_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => SheetConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.persistence.db_path.clone_from(db);
    }
    Ok(config)
}

fn open_session(
    config: &SheetConfig,
    chat: &std::path::Path,
    with_model: bool,
) -> anyhow::Result<SheetSession> {
    let provider = StaticProvider::from_json_file(chat)
        .with_context(|| format!("loading chat snapshot {}", chat.display()))?;
    let store = SqliteSettings::open(&config.persistence).context("opening settings database")?;
    let model = if with_model {
        LlmClient::from_config(&config.llm)?
    } else {
        LlmClient::none()
    };

    let session = SheetSession::new(Arc::new(provider), Arc::new(model), ExtensionSettings::new(store))
        .with_evaluation_config(config.evaluation.clone())
        .with_llm_config(config.llm.clone());
    session.rebuild_roster();
    Ok(session)
}

fn print_sheets(session: &SheetSession) {
    let total = session.roster().len();
    for index in 0..total {
        session.set_view_index(index);
        if let Some(view) = session.panel_view() {
            print!("{view}");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.general);

    match &cli.command {
        Commands::Presets => {
            for preset in PRESETS {
                let stats: Vec<&str> = preset.stat_names().collect();
                println!(
                    "{:<14} {:<28} {}..{}  {}",
                    preset.key,
                    preset.name,
                    preset.min,
                    preset.max,
                    stats.join(", ")
                );
            }
        }
        Commands::Roster { chat } => {
            let provider = StaticProvider::from_json_file(chat)
                .with_context(|| format!("loading chat snapshot {}", chat.display()))?;
            for (i, p) in build_roster(&provider.snapshot()).iter().enumerate() {
                let marker = if p.is_user { " (user)" } else { "" };
                println!("{}. {}{marker}", i + 1, p.name);
            }
        }
        Commands::Sheet { chat } => {
            let session = open_session(&config, chat, false)?;
            print_sheets(&session);
            session.save()?;
        }
        Commands::Evaluate {
            chat,
            fresh,
            preset,
        } => {
            let session = open_session(&config, chat, true)?.with_presenter(Arc::new(ConsolePresenter));
            if let Some(key) = preset {
                session.set_preset(key)?;
            }
            info!(db = %config.persistence.db_path.display(), "Starting evaluation");
            let outcome = session.evaluate_all_characters(*fresh).await;
            println!("{outcome}");
            println!("{}", session.counters());
        }
    }
    Ok(())
}
