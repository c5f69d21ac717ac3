//! # charsheet-host — Host Integration for Character Sheets
//!
//! The layer a chat host embeds. It owns the per-session state and wires the
//! host's ports to the core model and the LLM layer.
//!
//! ```text
//!  host events ──► EventHooks ──► SheetSession ──► ModelService
//!                                   │    │
//!                   SessionProvider ┘    └──► Presenter (PanelView)
//!                   ExtensionSettings
//! ```
//!
//! ## Modules
//!
//! - `session` — the session context object and its accessors
//! - `evaluation` — the evaluation cycle and its outcome
//! - `hooks` — host event policy (roster rebuilds, fresh and periodic evaluation)
//! - `presenter` — presentation port and the panel view-model
//! - `provider` — chat/session context port
//! - `telemetry` — tracing subscriber setup

pub mod evaluation;
pub mod events;
pub mod hooks;
pub mod presenter;
pub mod provider;
pub mod session;
pub mod telemetry;

pub use evaluation::EvalOutcome;
pub use events::HostEvent;
pub use hooks::{EventHooks, Trigger};
pub use presenter::{PanelView, Presenter, StatRow};
pub use provider::{SessionProvider, StaticProvider};
pub use session::SheetSession;
