use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use client_core::{
    presenter::{self, Run, Section},
    ChatController, HttpTriageTransport, TranscriptEntry, UiEvent, EMERGENCY_BANNER_AUTO_HIDE,
};
use shared::domain::{
    char_count_level, CharCountLevel, MessageKind, Sender, MAX_MESSAGE_UTF16_UNITS,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

mod config;

#[derive(Parser, Debug)]
struct Args {
    /// Triage service base URL; overrides triage.toml and env settings.
    #[arg(long)]
    server_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = config::load_settings();
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    debug!(server_url = %settings.server_url, "starting triage chat");

    let transport = HttpTriageTransport::new(settings.server_url.clone());
    let controller = ChatController::new_with_timing(
        Arc::new(transport),
        Duration::from_secs(settings.request_timeout_secs),
        EMERGENCY_BANNER_AUTO_HIDE,
    );

    for entry in controller.transcript().await {
        print_entry(&entry);
    }
    println!("(type a message, or /clear, /tips, /quit)");

    {
        let mut events = controller.subscribe_events();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                print_event(&event);
            }
        });
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" => break,
            "/clear" => controller.clear_conversation().await,
            "/tips" => match controller.health_tips().await {
                Ok(tips) => {
                    println!("Health tips:");
                    for tip in tips {
                        println!("  - {tip}");
                    }
                }
                Err(err) => println!("! could not load health tips: {err}"),
            },
            _ => {
                if let Some(hint) = compose_hint(line.trim()) {
                    println!("{hint}");
                }
                // Failures are already surfaced through the event stream.
                let _ = controller.submit(&line).await;
            }
        }
    }

    Ok(())
}

/// Counter hint shown once a message grows past the quiet band.
fn compose_hint(message: &str) -> Option<String> {
    let units = message.encode_utf16().count();
    match char_count_level(units) {
        CharCountLevel::Normal => None,
        CharCountLevel::Elevated => {
            Some(format!("({units}/{MAX_MESSAGE_UTF16_UNITS} characters)"))
        }
        CharCountLevel::NearLimit => Some(format!(
            "({units}/{MAX_MESSAGE_UTF16_UNITS} characters, near the limit)"
        )),
    }
}

fn print_event(event: &UiEvent) {
    match event {
        UiEvent::MessageAppended(entry) => print_entry(entry),
        UiEvent::TurnFailed { notice } => println!("! {notice}"),
        UiEvent::MetricsUpdated(metrics) => {
            let secs = metrics
                .response_secs
                .map(|s| format!("{s:.2}s"))
                .unwrap_or_else(|| "--".to_string());
            let risk = metrics
                .risk_level
                .as_ref()
                .map(|r| presenter::capitalize_first(r.style_key()))
                .unwrap_or_else(|| "--".to_string());
            let urgency = metrics
                .urgency
                .as_ref()
                .map(|u| presenter::capitalize_first(u.style_key()))
                .unwrap_or_else(|| "--".to_string());
            println!("[response {secs} | risk {risk} | urgency {urgency}]");
        }
        UiEvent::EmergencyBannerShown { message } => {
            println!("=== EMERGENCY: {message} ===");
        }
        UiEvent::EmergencyBannerHidden => println!("=== emergency banner dismissed ==="),
        UiEvent::ConversationCleared => println!("(conversation cleared)"),
        UiEvent::EmergencyAttention
        | UiEvent::InputCleared
        | UiEvent::FocusInput => {}
    }
}

fn print_entry(entry: &TranscriptEntry) {
    match entry.sender {
        Sender::User => println!("You: {}", entry.body),
        Sender::Assistant => match (&entry.reply, entry.kind) {
            (Some(reply), MessageKind::Normal) => {
                for line in render_sections(reply) {
                    println!("{line}");
                }
            }
            (_, MessageKind::Emergency) => println!("Assistant [EMERGENCY]: {}", entry.body),
            _ => println!("Assistant: {}", entry.body),
        },
    }
}

fn render_sections(reply: &shared::protocol::TriageReply) -> Vec<String> {
    let rendered = presenter::present(reply);
    let mut lines = Vec::new();
    for section in rendered.sections {
        match section {
            Section::Header {
                confidence,
                urgency,
                risk,
            } => {
                lines.push(format!(
                    "Assistant [{} | {} | {}]:",
                    confidence.label, urgency.label, risk.label
                ));
            }
            Section::Body { paragraphs } => {
                for paragraph in paragraphs {
                    let mut line = String::new();
                    for run in paragraph.runs {
                        match run {
                            Run::Text(text) => line.push_str(&text),
                            Run::Bold(text) => {
                                line.push('*');
                                line.push_str(&text);
                                line.push('*');
                            }
                        }
                    }
                    lines.push(format!("  {line}"));
                }
            }
            Section::SymptomAnalysis { conditions } => {
                lines.push("  Symptom analysis:".to_string());
                for condition in conditions {
                    lines.push(format!(
                        "    - {} ({}%): {}",
                        condition.name, condition.percent, condition.reasoning
                    ));
                }
            }
            Section::Recommendation { text } => {
                lines.push(format!("  Recommended action: {text}"));
            }
            Section::Disclaimers { lines: disclaimers } => {
                for disclaimer in disclaimers {
                    lines.push(format!("  (i) {disclaimer}"));
                }
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_gets_no_counter_hint() {
        assert_eq!(compose_hint("mild headache"), None);
    }

    #[test]
    fn counter_hint_appears_past_the_quiet_band() {
        let hint = compose_hint(&"a".repeat(750)).expect("hint");
        assert_eq!(hint, "(750/1000 characters)");

        let hint = compose_hint(&"a".repeat(950)).expect("hint");
        assert_eq!(hint, "(950/1000 characters, near the limit)");
    }
}
