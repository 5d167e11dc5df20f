use crate::models::{ChannelId, Question, QuestionPoll, UserId};
use crate::shuffle::build_poll;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::fmt;

pub const DEFAULT_NEGATIVE_MARK: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingAnswer(usize),
    Complete,
}

/// Progress counters; `score + wrong == current` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    pub score: usize,
    pub wrong: usize,
}

/// What happened to the session after one answer was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Next(QuestionPoll),
    Finished(TestReport),
}

/// One user's test. Owns its questions; the live bank is never consulted again.
#[derive(Debug)]
pub struct Session {
    user_id: UserId,
    channel: ChannelId,
    questions: Vec<Question>,
    current: usize,
    score: usize,
    wrong: usize,
    // correct index of the options as they were shuffled for the pending delivery
    pending_correct: Option<usize>,
    negative_mark: f64,
    started_at: DateTime<Utc>,
}

impl Session {
    /// Builds the session and the first delivery. `questions` must not be empty.
    pub fn start<R: Rng + ?Sized>(
        user_id: UserId,
        channel: ChannelId,
        questions: Vec<Question>,
        negative_mark: f64,
        rng: &mut R,
    ) -> (Self, QuestionPoll) {
        let mut session = Self {
            user_id,
            channel,
            questions,
            current: 0,
            score: 0,
            wrong: 0,
            pending_correct: None,
            negative_mark,
            started_at: Utc::now(),
        };
        let poll = session.deliver_current(rng);
        (session, poll)
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn state(&self) -> SessionState {
        if self.current < self.total() {
            SessionState::AwaitingAnswer(self.current)
        } else {
            SessionState::Complete
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state() == SessionState::Complete
    }

    pub fn progress(&self) -> Progress {
        Progress {
            current: self.current,
            total: self.total(),
            score: self.score,
            wrong: self.wrong,
        }
    }

    fn deliver_current<R: Rng + ?Sized>(&mut self, rng: &mut R) -> QuestionPoll {
        let poll = build_poll(&self.questions[self.current], rng);
        self.pending_correct = Some(poll.correct_index);
        poll
    }

    /// Scores `selected` against the pending delivery and advances the cursor.
    /// Returns `None` once the session is complete.
    pub fn answer<R: Rng + ?Sized>(&mut self, selected: usize, rng: &mut R) -> Option<Step> {
        if self.is_complete() {
            return None;
        }
        let correct = self
            .pending_correct
            .take()
            .unwrap_or(self.questions[self.current].correct_option);
        if selected == correct {
            self.score += 1;
        } else {
            self.wrong += 1;
        }
        self.current += 1;

        if self.is_complete() {
            Some(Step::Finished(self.report()))
        } else {
            Some(Step::Next(self.deliver_current(rng)))
        }
    }

    pub fn report(&self) -> TestReport {
        TestReport::new(self.total(), self.score, self.wrong, self.negative_mark)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    pub total: usize,
    pub score: usize,
    pub wrong: usize,
    pub negative: f64,
    pub final_score: f64,
}

impl TestReport {
    pub fn new(total: usize, score: usize, wrong: usize, negative_mark: f64) -> Self {
        let negative = wrong as f64 * negative_mark;
        Self {
            total,
            score,
            wrong,
            negative,
            final_score: score as f64 - negative,
        }
    }
}

impl fmt::Display for TestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "🎉 Test Finished!\n\n📊 Total Questions: {}\n✅ Correct: {}\n❌ Wrong: {}\n➖ Negative Marks: {:.2}\n\n🏆 Final Score: {:.2} / {}",
            self.total, self.score, self.wrong, self.negative, self.final_score, self.total
        )
    }
}
