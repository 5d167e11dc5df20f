use crate::dispatch::TelegramDispatcher;
use crate::engine::QuizEngine;
use crate::models::{AnswerEvent, ChannelId, InboundEvent, StartTestRequest, UserId};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

static TEST_COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/test(\d+)(?:@\w+)?(?:\s+(\S+))?\s*$").expect("valid test command pattern")
});
static PLAIN_COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/(start|help|subjects)(?:@\w+)?\s*$").expect("valid command pattern"));

const POLL_TIMEOUT_SECS: u64 = 30;
const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_answer: Option<PollAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollAnswer {
    pub poll_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default)]
    pub option_ids: Vec<usize>,
}

impl Update {
    pub fn into_event(self) -> InboundEvent {
        if let Some(answer) = self.poll_answer {
            return match (answer.user, answer.option_ids.first()) {
                (Some(user), Some(&selected)) => InboundEvent::Answer(AnswerEvent {
                    user_id: UserId(user.id),
                    selected_option: selected,
                }),
                // retracted vote or anonymous poll
                _ => InboundEvent::Unrecognized,
            };
        }
        match self.message {
            Some(message) => parse_command(&message),
            None => InboundEvent::Unrecognized,
        }
    }
}

pub fn parse_command(message: &Message) -> InboundEvent {
    let Some(text) = message.text.as_deref().map(str::trim) else {
        return InboundEvent::Unrecognized;
    };
    let channel = ChannelId(message.chat.id);

    if let Some(caps) = TEST_COMMAND.captures(text) {
        let Some(user) = message.from.as_ref() else {
            return InboundEvent::Unrecognized;
        };
        // digits that overflow become usize::MAX and fail size validation downstream
        let count = caps[1].parse::<usize>().unwrap_or(usize::MAX);
        return InboundEvent::Start(StartTestRequest {
            user_id: UserId(user.id),
            channel,
            count,
            subject: caps.get(2).map(|m| m.as_str().to_string()),
        });
    }

    match PLAIN_COMMAND.captures(text).map(|caps| caps[1].to_string()).as_deref() {
        Some("start") | Some("help") => InboundEvent::Welcome { channel },
        Some("subjects") => InboundEvent::ListSubjects { channel },
        _ => InboundEvent::Unrecognized,
    }
}

/// Long-polls `getUpdates` and feeds every update to the engine, in order.
pub async fn run_polling(client: TelegramDispatcher, engine: Arc<QuizEngine>) {
    let mut offset: i64 = 0;
    info!("telegram long polling started");
    loop {
        let body = json!({
            "offset": offset,
            "timeout": POLL_TIMEOUT_SECS,
            "allowed_updates": ["message", "poll_answer"],
        });
        let result = match client.call("getUpdates", body).await {
            Ok(result) => result,
            Err(err) => {
                warn!("getUpdates failed: {:#}", err);
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };
        let raw: Vec<serde_json::Value> = match serde_json::from_value(result) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("getUpdates returned no update list: {}", err);
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };
        for value in raw {
            let (next, event) = decode_update(value);
            if let Some(next) = next {
                offset = offset.max(next);
            }
            engine.handle(event).await;
        }
    }
}

/// Decodes one raw update into the offset to confirm it with and its event.
/// Undecodable updates are still confirmed when their id is readable, so a
/// single bad entry cannot stall the poll loop.
pub fn decode_update(value: serde_json::Value) -> (Option<i64>, InboundEvent) {
    let update_id = value.get("update_id").and_then(|v| v.as_i64());
    match serde_json::from_value::<Update>(value) {
        Ok(update) => (Some(update.update_id + 1), update.into_event()),
        Err(err) => {
            warn!(update_id = ?update_id, "skipping undecodable telegram update: {}", err);
            (update_id.map(|id| id + 1), InboundEvent::Unrecognized)
        }
    }
}
