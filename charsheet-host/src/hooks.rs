//! Event hooks: turning host lifecycle events into roster updates and
//! evaluation cycles.
//!
//! Policy:
//! - `AppReady` rebuilds the roster and redraws.
//! - `ChatChanged` starts a fresh roster, resets the message counter and, if
//!   the new chat has at most one message, arms a fresh evaluation.
//! - `MessageReceived` rebuilds the roster and either fires the armed fresh
//!   evaluation (after `fresh_delay_ms`) or an incremental one every
//!   `every_n_messages` messages.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use charsheet_llm::prompt::EvalMode;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::evaluation::EvalOutcome;
use crate::events::HostEvent;
use crate::session::SheetSession;

/// What an event asks the session to do after the roster update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Nothing further.
    None,
    /// A fresh evaluation after `delay`.
    Fresh {
        /// Wait before evaluating, letting the host settle.
        delay: Duration,
    },
    /// An incremental evaluation right away.
    Incremental,
}

/// Subscribes a [`SheetSession`] to host events.
#[derive(Debug)]
pub struct EventHooks {
    session: Arc<SheetSession>,
    messages_since_eval: AtomicU32,
    fresh_armed: AtomicBool,
}

impl EventHooks {
    /// Hooks driving `session`.
    #[must_use]
    pub fn new(session: Arc<SheetSession>) -> Self {
        Self {
            session,
            messages_since_eval: AtomicU32::new(0),
            fresh_armed: AtomicBool::new(false),
        }
    }

    /// The driven session.
    #[must_use]
    pub fn session(&self) -> &Arc<SheetSession> {
        &self.session
    }

    /// Whether the next received message fires a fresh evaluation.
    #[must_use]
    pub fn fresh_armed(&self) -> bool {
        self.fresh_armed.load(Ordering::Acquire)
    }

    /// Update the roster for `event` and decide what to evaluate.
    pub fn on_event(&self, event: HostEvent) -> Trigger {
        let config = self.session.evaluation_config();
        let trigger = match event {
            HostEvent::AppReady => {
                self.session.rebuild_roster();
                self.session.refresh_presenter();
                Trigger::None
            }
            HostEvent::ChatChanged => {
                let messages = self.session.reset_roster();
                self.messages_since_eval.store(0, Ordering::Release);
                self.fresh_armed.store(messages <= 1, Ordering::Release);
                self.session.refresh_presenter();
                Trigger::None
            }
            HostEvent::MessageReceived => {
                self.session.rebuild_roster();
                self.session.refresh_presenter();
                if self.fresh_armed.swap(false, Ordering::AcqRel) {
                    self.messages_since_eval.store(0, Ordering::Release);
                    Trigger::Fresh {
                        delay: Duration::from_millis(config.fresh_delay_ms),
                    }
                } else {
                    let count = self.messages_since_eval.fetch_add(1, Ordering::AcqRel) + 1;
                    if config.every_n_messages > 0 && count >= config.every_n_messages {
                        self.messages_since_eval.store(0, Ordering::Release);
                        Trigger::Incremental
                    } else {
                        Trigger::None
                    }
                }
            }
        };
        debug!(%event, ?trigger, "Host event handled");
        trigger
    }

    /// Handle `event` to completion, including any evaluation it triggers.
    pub async fn handle(&self, event: HostEvent) -> Option<EvalOutcome> {
        match self.on_event(event) {
            Trigger::None => None,
            Trigger::Fresh { delay } => {
                tokio::time::sleep(delay).await;
                Some(self.session.evaluate(EvalMode::Fresh).await)
            }
            Trigger::Incremental => Some(self.session.evaluate(EvalMode::Incremental).await),
        }
    }

    /// Handle `event` on the tokio runtime without waiting for it.
    pub fn spawn(self: &Arc<Self>, event: HostEvent) -> JoinHandle<Option<EvalOutcome>> {
        let hooks = Arc::clone(self);
        tokio::spawn(async move { hooks.handle(event).await })
    }
}
