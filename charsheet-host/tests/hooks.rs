//! Host event policy tests. Time is paused, so the fresh-evaluation delay
//! elapses instantly.

use std::sync::Arc;

use async_trait::async_trait;
use charsheet_core::config::EvaluationConfig;
use charsheet_core::settings::{ExtensionSettings, MemorySettings};
use charsheet_core::types::{CharacterCard, ChatMessage, ChatSnapshot};
use charsheet_host::{EvalOutcome, EventHooks, HostEvent, SheetSession, StaticProvider, Trigger};
use charsheet_llm::prompt::{FRESH_INSTRUCTION, UPDATE_INSTRUCTION};
use charsheet_llm::{LlmError, LlmRequest, LlmResponse, ModelService};
use parking_lot::Mutex;

/// Always returns the same reply and records prompts.
struct EchoModel {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ModelService for EchoModel {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.prompts.lock().push(request.prompt.clone());
        Ok(LlmResponse::from_text(self.reply.clone()))
    }
}

fn opening() -> ChatSnapshot {
    ChatSnapshot {
        messages: vec![],
        primary: Some(CharacterCard::new("Seraphina")),
        characters: vec![],
        user_name: Some("Kai".into()),
    }
}

struct Rig {
    provider: Arc<StaticProvider>,
    model: Arc<EchoModel>,
    hooks: Arc<EventHooks>,
}

fn rig(every_n_messages: u32) -> Rig {
    let provider = Arc::new(StaticProvider::new(opening()));
    let model = Arc::new(EchoModel {
        reply: r#"{"Seraphina": {"title": "Seraphina, the Forest Warden", "stats": {"Wisdom": 16}}}"#.into(),
        prompts: Mutex::new(Vec::new()),
    });
    let session = SheetSession::new(
        provider.clone(),
        model.clone(),
        ExtensionSettings::new(MemorySettings::new()),
    )
    .with_evaluation_config(EvaluationConfig {
        every_n_messages,
        fresh_delay_ms: 1500,
        ..EvaluationConfig::default()
    });
    Rig {
        provider,
        model,
        hooks: Arc::new(EventHooks::new(Arc::new(session))),
    }
}

#[tokio::test(start_paused = true)]
async fn new_chat_gets_a_fresh_evaluation_on_first_message() {
    let rig = rig(3);
    assert_eq!(rig.hooks.handle(HostEvent::ChatChanged).await, None);
    assert!(rig.hooks.fresh_armed());

    rig.provider
        .push_message(ChatMessage::character("Seraphina", "You wake in the glade."));
    let outcome = rig.hooks.handle(HostEvent::MessageReceived).await;
    assert!(matches!(outcome, Some(EvalOutcome::Applied { participants: 1, .. })));
    assert!(!rig.hooks.fresh_armed());

    let prompts = rig.model.prompts.lock().clone();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(FRESH_INSTRUCTION));
    assert_eq!(
        rig.hooks.session().get_stats_for_name("Seraphina")["Wisdom"],
        16
    );
}

#[tokio::test(start_paused = true)]
async fn fresh_trigger_carries_the_configured_delay() {
    let rig = rig(3);
    rig.hooks.on_event(HostEvent::ChatChanged);
    assert_eq!(
        rig.hooks.on_event(HostEvent::MessageReceived),
        Trigger::Fresh {
            delay: std::time::Duration::from_millis(1500)
        }
    );
}

#[tokio::test(start_paused = true)]
async fn ongoing_chat_evaluates_every_n_messages() {
    let rig = rig(2);
    for i in 0..3 {
        rig.provider
            .push_message(ChatMessage::character("Seraphina", format!("line {i}")));
    }
    rig.hooks.handle(HostEvent::ChatChanged).await;
    assert!(!rig.hooks.fresh_armed());

    assert_eq!(rig.hooks.on_event(HostEvent::MessageReceived), Trigger::None);
    assert_eq!(rig.hooks.on_event(HostEvent::MessageReceived), Trigger::Incremental);
    assert_eq!(rig.hooks.on_event(HostEvent::MessageReceived), Trigger::None);

    let outcome = rig.hooks.handle(HostEvent::MessageReceived).await;
    assert!(outcome.is_some_and(EvalOutcome::is_applied));
    assert!(rig.model.prompts.lock()[0].contains(UPDATE_INSTRUCTION));
}

#[tokio::test(start_paused = true)]
async fn zero_interval_disables_periodic_evaluation() {
    let rig = rig(0);
    rig.provider.push_message(ChatMessage::user("Kai", "hi"));
    rig.provider.push_message(ChatMessage::user("Kai", "hello?"));
    rig.hooks.on_event(HostEvent::ChatChanged);
    for _ in 0..5 {
        assert_eq!(rig.hooks.on_event(HostEvent::MessageReceived), Trigger::None);
    }
}

#[tokio::test(start_paused = true)]
async fn titles_survive_messages_but_not_chat_switches() {
    let rig = rig(1);
    rig.provider.push_message(ChatMessage::user("Kai", "Hello?"));
    rig.provider.push_message(ChatMessage::character("Seraphina", "Rest."));
    rig.hooks.handle(HostEvent::ChatChanged).await;

    let outcome = rig.hooks.spawn(HostEvent::MessageReceived).await.expect("task completes");
    assert!(outcome.is_some_and(EvalOutcome::is_applied));

    rig.provider.push_message(ChatMessage::character("Goran", "Who goes there?"));
    rig.hooks.on_event(HostEvent::AppReady);
    let session = rig.hooks.session();
    let names: Vec<String> = session.roster().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Seraphina", "Goran", "Kai"]);
    assert_eq!(session.roster()[0].title, "Seraphina, the Forest Warden");

    rig.provider.replace(opening());
    rig.hooks.on_event(HostEvent::ChatChanged);
    assert_eq!(session.roster()[0].title, "Seraphina");
    assert_eq!(session.view_index(), 0);
}
