use crate::bank::BankHandle;
use crate::dispatch::Dispatcher;
use crate::error::QuizError;
use crate::models::{AnswerEvent, ChannelId, InboundEvent, QuestionPoll, StartTestRequest, UserId};
use crate::session::{Progress, Session, Step, TestReport, DEFAULT_NEGATIVE_MARK};
use crate::shuffle::select_subset;
use crate::store::SessionStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub title: String,
    pub negative_mark: f64,
    pub max_test_size: usize,
    /// Sizes advertised in the welcome message.
    pub test_sizes: Vec<usize>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            title: "Quiz Bot".to_string(),
            negative_mark: DEFAULT_NEGATIVE_MARK,
            max_test_size: 200,
            test_sizes: vec![20, 30, 50, 100],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedTest {
    pub user_id: UserId,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    /// No live session for the user; the event was dropped.
    Ignored,
    Advanced(Progress),
    Completed(TestReport),
}

pub struct QuizEngine {
    bank: BankHandle,
    store: SessionStore,
    dispatcher: Arc<dyn Dispatcher>,
    settings: EngineSettings,
}

impl QuizEngine {
    pub fn new(bank: BankHandle, dispatcher: Arc<dyn Dispatcher>, settings: EngineSettings) -> Self {
        Self {
            bank,
            store: SessionStore::new(),
            dispatcher,
            settings,
        }
    }

    pub fn bank(&self) -> &BankHandle {
        &self.bank
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Draws the questions, replaces any running test of the user and sends
    /// the first question. Nothing is stored when validation fails.
    pub async fn start(&self, request: &StartTestRequest) -> Result<StartedTest, QuizError> {
        if request.count == 0 || request.count > self.settings.max_test_size {
            return Err(QuizError::InvalidTestSize {
                requested: request.count,
                max: self.settings.max_test_size,
            });
        }

        let bank = self.bank.current().await;
        let (session, first, subject) = {
            let pool = bank.pool_for(request.subject.as_deref())?;
            let mut rng = rand::thread_rng();
            let questions = select_subset(pool.questions, request.count, &mut rng)?;
            let (session, first) = Session::start(
                request.user_id,
                request.channel,
                questions,
                self.settings.negative_mark,
                &mut rng,
            );
            (session, first, pool.subject.map(|p| p.name.clone()))
        };

        if self.store.contains(request.user_id) {
            info!(user = %request.user_id, "running test superseded by a new one");
        }
        let (_slot, _serialized) = self.store.create(session).await;
        info!(user = %request.user_id, total = request.count, subject = ?subject, "test started");

        let mut intro = format!("🚀 {} Question Test Started!", request.count);
        if let Some(name) = &subject {
            intro.push_str(&format!("\n📚 Subject: {name}"));
        }
        intro.push_str(&format!("\n\nNegative Marking: -{}", self.settings.negative_mark));
        self.send_text(request.channel, &intro).await;
        self.send_question(request.channel, &first).await;

        Ok(StartedTest {
            user_id: request.user_id,
            total: request.count,
            subject,
        })
    }

    /// Applies one answer. Answers for a missing, finished or superseded
    /// session are dropped without touching any state.
    pub async fn submit_answer(&self, event: AnswerEvent) -> AnswerOutcome {
        let Some(slot) = self.store.get(event.user_id) else {
            debug!(user = %event.user_id, "answer without an active test ignored");
            return AnswerOutcome::Ignored;
        };
        let mut session = slot.lock().await;
        if session.is_complete() || !self.store.is_current(event.user_id, &slot) {
            debug!(user = %event.user_id, "answer for a finished or replaced test ignored");
            return AnswerOutcome::Ignored;
        }

        let step = {
            let mut rng = rand::thread_rng();
            session.answer(event.selected_option, &mut rng)
        };
        let channel = session.channel();
        match step {
            None => AnswerOutcome::Ignored,
            Some(Step::Next(poll)) => {
                let progress = session.progress();
                self.send_question(channel, &poll).await;
                AnswerOutcome::Advanced(progress)
            }
            Some(Step::Finished(report)) => {
                let elapsed = chrono::Utc::now() - session.started_at();
                info!(
                    user = %event.user_id,
                    score = report.score,
                    wrong = report.wrong,
                    final_score = report.final_score,
                    elapsed_secs = elapsed.num_seconds(),
                    "test finished"
                );
                self.send_text(channel, &report.to_string()).await;
                self.store.remove_if_current(event.user_id, &slot);
                AnswerOutcome::Completed(report)
            }
        }
    }

    /// Entry point for transport adapters. Request errors go back to the
    /// requesting channel as text.
    pub async fn handle(&self, event: InboundEvent) {
        match event {
            InboundEvent::Welcome { channel } => {
                let text = self.welcome_text().await;
                self.send_text(channel, &text).await;
            }
            InboundEvent::ListSubjects { channel } => {
                let text = self.subjects_text().await;
                self.send_text(channel, &text).await;
            }
            InboundEvent::Start(request) => {
                if let Err(err) = self.start(&request).await {
                    info!(user = %request.user_id, "test not started: {}", err);
                    self.send_text(request.channel, &err.user_message()).await;
                }
            }
            InboundEvent::Answer(answer) => {
                self.submit_answer(answer).await;
            }
            InboundEvent::Unrecognized => {}
        }
    }

    pub async fn welcome_text(&self) -> String {
        let mut text = format!("👋 Welcome to {}\n\nChoose Test Mode:\n", self.settings.title);
        for size in &self.settings.test_sizes {
            text.push_str(&format!("\n/test{size}"));
        }
        let bank = self.bank.current().await;
        if let Some(first) = bank.subjects().partitions().first() {
            let available = first.end - first.start;
            let size = self
                .settings
                .test_sizes
                .iter()
                .copied()
                .filter(|size| *size <= available)
                .max()
                .unwrap_or(available);
            text.push_str(&format!(
                "\n\nAdd a subject to narrow the test, e.g. /test{} {}\n/subjects lists them all.",
                size, first.key
            ));
        }
        text
    }

    pub async fn subjects_text(&self) -> String {
        let bank = self.bank.current().await;
        let subjects = bank.subjects();
        if subjects.is_empty() {
            return "No subjects are configured.".to_string();
        }
        let mut text = "📚 Subjects:".to_string();
        for p in subjects.partitions() {
            text.push_str(&format!("\n{} — {} ({} questions)", p.key, p.name, p.end - p.start));
        }
        text
    }

    async fn send_question(&self, channel: ChannelId, poll: &QuestionPoll) {
        if let Err(err) = self.dispatcher.present_question(channel, poll).await {
            warn!(%channel, "failed to present question: {:#}", err);
        }
    }

    async fn send_text(&self, channel: ChannelId, text: &str) {
        if let Err(err) = self.dispatcher.send_report(channel, text).await {
            warn!(%channel, "failed to send message: {:#}", err);
        }
    }
}
