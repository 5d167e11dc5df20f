use crate::models::{ChannelId, QuestionPoll};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

/// Telegram caps quiz explanations at 200 characters.
const EXPLANATION_LIMIT: usize = 200;

/// Outbound side of the messaging transport.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn present_question(&self, channel: ChannelId, poll: &QuestionPoll) -> anyhow::Result<()>;

    /// Plain text message: announcements, errors and the final report.
    async fn send_report(&self, channel: ChannelId, text: &str) -> anyhow::Result<()>;
}

#[derive(Clone, Default)]
pub struct LogDispatcher;

#[async_trait]
impl Dispatcher for LogDispatcher {
    async fn present_question(&self, channel: ChannelId, poll: &QuestionPoll) -> anyhow::Result<()> {
        info!(%channel, options = poll.options.len(), "present question: {}", poll.prompt);
        Ok(())
    }

    async fn send_report(&self, channel: ChannelId, text: &str) -> anyhow::Result<()> {
        info!(%channel, "send message: {}", text);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Question { channel: ChannelId, poll: QuestionPoll },
    Report { channel: ChannelId, text: String },
}

/// Keeps every dispatch in memory, in call order.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<Dispatched>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Dispatched> {
        self.sent.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, channel: ChannelId) -> Vec<Dispatched> {
        self.sent()
            .into_iter()
            .filter(|d| match d {
                Dispatched::Question { channel: c, .. } | Dispatched::Report { channel: c, .. } => *c == channel,
            })
            .collect()
    }

    /// Most recent question sent to `channel`.
    pub fn last_question(&self, channel: ChannelId) -> Option<QuestionPoll> {
        self.sent_to(channel).into_iter().rev().find_map(|d| match d {
            Dispatched::Question { poll, .. } => Some(poll),
            Dispatched::Report { .. } => None,
        })
    }

    pub fn last_report(&self, channel: ChannelId) -> Option<String> {
        self.sent_to(channel).into_iter().rev().find_map(|d| match d {
            Dispatched::Report { text, .. } => Some(text),
            Dispatched::Question { .. } => None,
        })
    }

    fn push(&self, item: Dispatched) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(item);
        }
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn present_question(&self, channel: ChannelId, poll: &QuestionPoll) -> anyhow::Result<()> {
        self.push(Dispatched::Question {
            channel,
            poll: poll.clone(),
        });
        Ok(())
    }

    async fn send_report(&self, channel: ChannelId, text: &str) -> anyhow::Result<()> {
        self.push(Dispatched::Report {
            channel,
            text: text.to_string(),
        });
        Ok(())
    }
}

#[derive(Clone)]
pub struct TelegramDispatcher {
    pub http: reqwest::Client,
    pub api_url: String,
    pub token: String,
}

impl TelegramDispatcher {
    pub fn new(api_url: &str, token: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(45))
            .build()?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    pub async fn call(&self, method: &str, body: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let resp = self.http.post(self.method_url(method)).json(&body).send().await?;
        let status = resp.status();
        let payload: serde_json::Value = resp.json().await?;
        if !status.is_success() || payload.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            let description = payload
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("no description");
            anyhow::bail!("telegram {} failed ({}): {}", method, status, description);
        }
        Ok(payload.get("result").cloned().unwrap_or(serde_json::Value::Null))
    }
}

pub fn truncate_explanation(text: &str) -> String {
    if text.chars().count() <= EXPLANATION_LIMIT {
        return text.to_string();
    }
    let mut out: String = text.chars().take(EXPLANATION_LIMIT - 1).collect();
    out.push('…');
    out
}

#[async_trait]
impl Dispatcher for TelegramDispatcher {
    async fn present_question(&self, channel: ChannelId, poll: &QuestionPoll) -> anyhow::Result<()> {
        let mut body = json!({
            "chat_id": channel.0,
            "question": poll.prompt,
            "options": poll.options,
            "type": "quiz",
            "correct_option_id": poll.correct_index,
            "is_anonymous": false,
        });
        if let Some(explanation) = poll.explanation.as_deref().filter(|e| !e.trim().is_empty()) {
            body["explanation"] = json!(truncate_explanation(explanation));
        }
        self.call("sendPoll", body).await?;
        Ok(())
    }

    async fn send_report(&self, channel: ChannelId, text: &str) -> anyhow::Result<()> {
        self.call("sendMessage", json!({ "chat_id": channel.0, "text": text })).await?;
        Ok(())
    }
}
