//! Character sheet benchmark suite.
//!
//! Everything on the evaluation path except the model call itself:
//!   roster_build_200_messages ......... chat log → participants
//!   combined_prompt_12_participants ... participants → prompt text
//!   parse_reply_chatty_12 ............. reply text → evaluation object
//!   parse_reply_decoy_braces .......... worst case for candidate scanning

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use charsheet_core::preset;
use charsheet_core::roster::build_roster;
use charsheet_core::types::{CharacterCard, ChatMessage, ChatSnapshot, StatSet};
use charsheet_llm::extract::parse_reply;
use charsheet_llm::prompt::{EvalMode, PromptCharacter, build_combined_eval_prompt, format_transcript};

const CAST: [&str; 11] = [
    "Seraphina", "Goran", "Mira", "Yuriko", "Armitage", "Lysa", "Thorne", "Vex", "Oona",
    "Bram", "Quill",
];

fn long_chat() -> ChatSnapshot {
    let messages = (0..200)
        .map(|i| {
            if i % 3 == 0 {
                ChatMessage::user("Kai", format!("I look around, turn {i}."))
            } else {
                ChatMessage::character(CAST[i % CAST.len()], format!("Something happens at turn {i}."))
            }
        })
        .collect();
    ChatSnapshot {
        messages,
        primary: Some(CharacterCard::new("Seraphina").with_avatar("seraphina.png")),
        characters: CAST
            .iter()
            .map(|n| CharacterCard::new(*n).with_avatar(format!("{n}.png")))
            .collect(),
        user_name: Some("Kai".into()),
    }
}

fn chatty_reply() -> String {
    let entries = CAST
        .iter()
        .chain(std::iter::once(&"Kai"))
        .map(|n| {
            format!(
                r#""{n}": {{"title": "{n}, the Unbroken", "stats": {{"Strength": 12, "Dexterity": 14, "Constitution": 9, "Intelligence": 16, "Wisdom": 11, "Charisma": 8}}}}"#
            )
        })
        .collect::<Vec<_>>()
        .join(",\n  ");
    format!("Sure! Here is the evaluation:\n```json\n{{\n  {entries}\n}}\n```\nLet me know if you need more.")
}

fn bench_roster(c: &mut Criterion) {
    let chat = long_chat();
    c.bench_function("roster_build_200_messages", |b| {
        b.iter(|| black_box(build_roster(black_box(&chat))));
    });
}

fn bench_prompt(c: &mut Criterion) {
    let chat = long_chat();
    let dnd = preset::default_preset();
    let characters: Vec<PromptCharacter> = build_roster(&chat)
        .into_iter()
        .map(|p| PromptCharacter {
            name: p.name,
            is_user: p.is_user,
            current_stats: StatSet::new(),
        })
        .collect();
    let transcript = format_transcript(&chat.messages, 20);

    c.bench_function("combined_prompt_12_participants", |b| {
        b.iter(|| {
            black_box(build_combined_eval_prompt(
                black_box(&characters),
                dnd,
                EvalMode::Incremental,
                Some(&transcript),
            ))
        });
    });
}

fn bench_parse(c: &mut Criterion) {
    let reply = chatty_reply();
    c.bench_function("parse_reply_chatty_12", |b| {
        b.iter(|| black_box(parse_reply(black_box(&reply))));
    });

    let mut decoys = "{not json} ".repeat(15);
    decoys.push_str(&reply);
    c.bench_function("parse_reply_decoy_braces", |b| {
        b.iter(|| black_box(parse_reply(black_box(&decoys))));
    });
}

criterion_group!(benches, bench_roster, bench_prompt, bench_parse);
criterion_main!(benches);
